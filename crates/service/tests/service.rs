use backend_client::{Backend, InMemoryBackend};
use chrono::{TimeZone, Utc};
use configuration::{AuthConfig, ExportConfig};
use core_types::{CustomValueInput, FieldKind, NewOrder, Profile, ReportingPeriod, Role};
use ranking::Standing;
use rust_decimal_macros::dec;
use service::{Caller, CustomFieldDraft, SalesService, ServiceError};
use std::io::Write;
use std::sync::Arc;

fn may_2024() -> ReportingPeriod {
    ReportingPeriod::new(2024, 5).unwrap()
}

fn service_over(backend: &InMemoryBackend) -> SalesService {
    SalesService::new(Arc::new(backend.clone()), AuthConfig::default(), ExportConfig::default())
}

fn caller(profile: &Profile) -> Caller {
    Caller::new(profile.clone())
}

fn new_order(client: &str, revenue: rust_decimal::Decimal) -> NewOrder {
    NewOrder {
        client_code: client.into(),
        product: "CDB".into(),
        volume: dec!(10000),
        revenue,
        custom_values: Vec::new(),
        target_operator: None,
    }
}

/// Two operators and one admin with the orders of the revenue/orderCount example.
fn seeded() -> (InMemoryBackend, Profile, Profile, Profile) {
    let backend = InMemoryBackend::with_metrics(dec!(50), dec!(50));
    let ana = backend.add_user("Ana", Role::Operator);
    let bruno = backend.add_user("Bruno", Role::Operator);
    let admin = backend.add_user("Paula", Role::Admin);
    let in_may = Utc.with_ymd_and_hms(2024, 5, 10, 12, 0, 0).unwrap();
    backend.add_order(ana.id, dec!(1000), in_may);
    backend.add_order(ana.id, dec!(500), in_may);
    backend.add_order(bruno.id, dec!(2000), in_may);
    // Outside the period; must not count.
    backend.add_order(ana.id, dec!(99999), Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap());
    (backend, ana, bruno, admin)
}

#[tokio::test]
async fn ranking_view_scores_the_period_and_reports_my_standing() {
    let (backend, ana, bruno, _) = seeded();
    let service = service_over(&backend);

    let view = service.ranking(&caller(&ana), may_2024()).await.unwrap();

    assert_eq!(view.entries.len(), 2);
    assert_eq!(view.entries[0].operator_id, bruno.id);
    assert_eq!(view.entries[0].score, dec!(1000.50));
    assert_eq!(view.entries[1].score, dec!(751.00));
    assert_eq!(view.podium.len(), 2);
    assert_eq!(view.me, Standing::Ranked { position: 2, score: dec!(751.00) });
}

#[tokio::test]
async fn admins_are_not_on_the_leaderboard() {
    let (backend, _, _, admin) = seeded();
    let view = service_over(&backend).ranking(&caller(&admin), may_2024()).await.unwrap();
    assert!(view.entries.iter().all(|e| e.operator_id != admin.id));
    assert_eq!(view.me, Standing::Unranked);
}

#[tokio::test]
async fn unreachable_backend_is_data_unavailable_not_empty() {
    let (backend, ana, _, _) = seeded();
    backend.set_offline(true);
    let err = service_over(&backend).ranking(&caller(&ana), may_2024()).await.unwrap_err();
    assert!(matches!(err, ServiceError::DataUnavailable(_)));
}

#[tokio::test]
async fn operators_see_only_their_orders_and_admins_can_search_all() {
    let (backend, ana, _, admin) = seeded();
    let service = service_over(&backend);

    let mine = service.list_orders(&caller(&ana), None).await.unwrap();
    assert_eq!(mine.len(), 3);
    assert!(mine.iter().all(|l| l.order.operator_id == ana.id));

    let all = service.list_orders(&caller(&admin), None).await.unwrap();
    assert_eq!(all.len(), 4);

    let bruno_only = service.list_orders(&caller(&admin), Some("bRuNo")).await.unwrap();
    assert_eq!(bruno_only.len(), 1);
    assert_eq!(bruno_only[0].operator_name, "Bruno");
}

#[tokio::test]
async fn order_is_validated_and_owned_by_the_caller() {
    let (backend, ana, _, _) = seeded();
    let service = service_over(&backend);

    let blank = new_order("   ", dec!(10));
    assert!(matches!(
        service.create_order(&caller(&ana), blank).await,
        Err(ServiceError::Validation(_))
    ));

    let order = service.create_order(&caller(&ana), new_order("C-77", dec!(25.5))).await.unwrap();
    assert_eq!(order.operator_id, ana.id);
    assert_eq!(order.client_code, "C-77");
}

#[tokio::test]
async fn only_admins_register_for_someone_else() {
    let (backend, ana, bruno, admin) = seeded();
    let service = service_over(&backend);

    let mut on_behalf = new_order("C-1", dec!(10));
    on_behalf.target_operator = Some(bruno.id);
    assert!(matches!(
        service.create_order(&caller(&ana), on_behalf.clone()).await,
        Err(ServiceError::Forbidden(_))
    ));

    let order = service.create_order(&caller(&admin), on_behalf).await.unwrap();
    assert_eq!(order.operator_id, bruno.id);
}

#[tokio::test]
async fn custom_values_are_decoded_against_their_field() {
    let (backend, ana, _, _) = seeded();
    let channel = backend.add_custom_field("Canal", FieldKind::Dropdown(vec!["Mesa".into(), "Digital".into()]), true);
    let service = service_over(&backend);

    let mut bad = new_order("C-2", dec!(1));
    bad.custom_values = vec![CustomValueInput { field_id: channel.id, value: Some("Telefone".into()) }];
    assert!(matches!(
        service.create_order(&caller(&ana), bad).await,
        Err(ServiceError::Validation(_))
    ));

    let mut good = new_order("C-3", dec!(1));
    good.custom_values = vec![CustomValueInput { field_id: channel.id, value: Some("Digital".into()) }];
    let order = service.create_order(&caller(&ana), good).await.unwrap();

    let stored = backend.custom_values_for(&[order.id]).await.unwrap();
    assert_eq!(stored.len(), 1);
    assert_eq!(stored[0].value.as_deref(), Some("Digital"));
}

#[tokio::test]
async fn delete_requires_owner_or_admin() {
    let (backend, ana, bruno, admin) = seeded();
    let service = service_over(&backend);
    let order = service.create_order(&caller(&ana), new_order("C-9", dec!(1))).await.unwrap();

    assert!(matches!(
        service.delete_order(&caller(&bruno), order.id).await,
        Err(ServiceError::Forbidden(_))
    ));
    service.delete_order(&caller(&admin), order.id).await.unwrap();
    assert!(matches!(
        service.delete_order(&caller(&ana), order.id).await,
        Err(ServiceError::NotFound(_))
    ));
}

#[tokio::test]
async fn metric_weight_must_be_a_percentage() {
    let (backend, ana, _, admin) = seeded();
    let service = service_over(&backend);
    let revenue = service.metrics().await.unwrap()[0].clone();

    assert!(matches!(
        service.update_metric_weight(&caller(&ana), revenue.id, dec!(60)).await,
        Err(ServiceError::Forbidden(_))
    ));
    assert!(matches!(
        service.update_metric_weight(&caller(&admin), revenue.id, dec!(100.01)).await,
        Err(ServiceError::Validation(_))
    ));

    // Unbalanced totals are accepted.
    let updated = service.update_metric_weight(&caller(&admin), revenue.id, dec!(80)).await.unwrap();
    assert_eq!(updated.weight, dec!(80));
}

#[tokio::test]
async fn admin_manages_custom_fields() {
    let (backend, ana, _, admin) = seeded();
    let service = service_over(&backend);

    let draft = CustomFieldDraft { name: "Canal".into(), kind: "dropdown".into(), options: Some("Mesa, ,Digital".into()) };
    let field = service.create_custom_field(&caller(&admin), draft).await.unwrap();
    assert_eq!(field.kind, FieldKind::Dropdown(vec!["Mesa".into(), "Digital".into()]));

    let empty = CustomFieldDraft { name: "Vazio".into(), kind: "DROPDOWN".into(), options: Some(" , ".into()) };
    assert!(service.create_custom_field(&caller(&admin), empty).await.is_err());

    assert!(matches!(
        service.custom_fields(&caller(&ana), true).await,
        Err(ServiceError::Forbidden(_))
    ));
    service.delete_custom_field(&caller(&admin), field.id).await.unwrap();
    assert!(service.custom_fields(&caller(&ana), false).await.unwrap().is_empty());
}

#[tokio::test]
async fn admin_cannot_demote_themselves() {
    let (backend, ana, _, admin) = seeded();
    let service = service_over(&backend);

    let promoted = service.promote(&caller(&admin), ana.id).await.unwrap();
    assert_eq!(promoted.role, Role::Admin);
    assert!(matches!(
        service.demote(&caller(&admin), admin.id).await,
        Err(ServiceError::Forbidden(_))
    ));
    let demoted = service.demote(&caller(&admin), ana.id).await.unwrap();
    assert_eq!(demoted.role, Role::Operator);
}

#[tokio::test]
async fn invited_operators_must_use_the_corporate_domain() {
    let (backend, _, _, admin) = seeded();
    let service = service_over(&backend);

    assert!(matches!(
        service.invite_operator(&caller(&admin), "x@gmail.com", None).await,
        Err(ServiceError::Validation(_))
    ));
    let profile = service
        .invite_operator(&caller(&admin), "carla.dias@InvestSmart.com.br", None)
        .await
        .unwrap();
    assert_eq!(profile.name.as_deref(), Some("Carla Dias"));
    assert_eq!(profile.role, Role::Operator);
}

#[tokio::test]
async fn export_writes_one_row_per_order_with_custom_columns() {
    let (backend, ana, _, admin) = seeded();
    let channel = backend.add_custom_field("Canal", FieldKind::Text, true);
    let retired = backend.add_custom_field("Antigo", FieldKind::Text, false);
    let service = service_over(&backend);
    let mut order = new_order("C-5", dec!(12.345));
    order.custom_values = vec![CustomValueInput { field_id: channel.id, value: Some("Mesa, SP".into()) }];
    service.create_order(&caller(&ana), order).await.unwrap();

    assert!(matches!(
        service.export_orders(&caller(&ana), ReportingPeriod::current()).await,
        Err(ServiceError::Forbidden(_))
    ));

    let export = service.export_orders(&caller(&admin), ReportingPeriod::current()).await.unwrap();
    assert_eq!(export.file_name, format!("orders-{}.csv", ReportingPeriod::current()));
    assert_eq!(export.rows, 1);

    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(&export.content).unwrap();
    let text = std::fs::read_to_string(file.path()).unwrap();
    let mut lines = text.lines();
    assert_eq!(
        lines.next().unwrap(),
        "id,operator,client_code,product,volume,revenue,created_at,Canal"
    );
    let row = lines.next().unwrap();
    assert!(row.contains(",Ana,C-5,CDB,10000.00,12.35,"));
    assert!(row.ends_with(",\"Mesa, SP\""));
    assert!(!text.contains(&retired.name));
}

#[tokio::test]
async fn retired_fields_with_stored_values_keep_their_column() {
    let (backend, ana, _, admin) = seeded();
    let retired = backend.add_custom_field("Antigo", FieldKind::Text, false);
    let unused = backend.add_custom_field("Vazio", FieldKind::Text, false);
    let service = service_over(&backend);
    let order = service.create_order(&caller(&ana), new_order("C-6", dec!(1))).await.unwrap();
    backend.add_custom_value(order.id, retired.id, "legado");

    let export = service.export_orders(&caller(&admin), ReportingPeriod::current()).await.unwrap();
    let text = String::from_utf8(export.content).unwrap();
    let mut lines = text.lines();

    assert_eq!(
        lines.next().unwrap(),
        "id,operator,client_code,product,volume,revenue,created_at,Antigo"
    );
    assert!(lines.next().unwrap().ends_with(",legado"));
    assert!(!text.contains(&unused.name));
}
