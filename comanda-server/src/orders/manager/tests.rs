use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;
use chrono::{Duration, NaiveDate, TimeZone};

use shared::models::{Courier, StoreInfo};
use shared::order::{
    OrderCommandPayload, OrderEdit, OrderItem, OrderPatch, OrderType, PaymentStatus,
};

use super::*;
use crate::collaborators::{
    CollaboratorError, MemoryCourierDirectory, MemoryOrderNumberGenerator, MemoryOrderStore,
    MemoryReceiptPrinter, OrderStore, ReceiptPrinter, StockDeduction,
};
use crate::orders::channel::ChannelRules;
use crate::orders::outbox::ReceiptReason;

// ========== Test doubles ==========

#[derive(Default)]
struct CountingStock {
    calls: AtomicUsize,
    fail: AtomicBool,
}

#[async_trait]
impl StockDeduction for CountingStock {
    async fn deduct(&self, _establishment_id: &str, _order_id: &str) -> CollabResult<()> {
        // 让出一次，模拟网络调用
        tokio::task::yield_now().await;
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail.load(Ordering::SeqCst) {
            return Err(CollaboratorError::Unavailable("stock down".to_string()));
        }
        Ok(())
    }
}

/// Fails while `offline` is set
#[derive(Default)]
struct FlakyPrinter {
    offline: AtomicBool,
    inner: MemoryReceiptPrinter,
}

#[async_trait]
impl ReceiptPrinter for FlakyPrinter {
    async fn print_receipt(&self, document: &ReceiptDocument) -> CollabResult<()> {
        if self.offline.load(Ordering::SeqCst) {
            return Err(CollaboratorError::Unavailable("printer offline".to_string()));
        }
        self.inner.print_receipt(document).await
    }

    async fn print_non_fiscal(&self, receipt: &NonFiscalReceipt) -> CollabResult<()> {
        if self.offline.load(Ordering::SeqCst) {
            return Err(CollaboratorError::Unavailable("printer offline".to_string()));
        }
        self.inner.print_non_fiscal(receipt).await
    }
}

/// Reads work, writes fail
struct ReadOnlyStore(MemoryOrderStore);

#[async_trait]
impl OrderStore for ReadOnlyStore {
    async fn list_since(&self, est: &str, since: DateTime<Utc>) -> CollabResult<Vec<Order>> {
        self.0.list_since(est, since).await
    }

    async fn get(&self, order_id: &str) -> CollabResult<Option<Order>> {
        self.0.get(order_id).await
    }

    async fn insert(&self, _order: Order) -> CollabResult<Order> {
        Err(CollaboratorError::Unavailable("read only".to_string()))
    }

    async fn update(&self, _id: &str, _patch: &OrderPatch, _now: DateTime<Utc>) -> CollabResult<Order> {
        Err(CollaboratorError::Unavailable("read only".to_string()))
    }
}

struct Fixture {
    manager: OrdersManager,
    stock: Arc<CountingStock>,
    printer: Arc<FlakyPrinter>,
    couriers: Arc<MemoryCourierDirectory>,
}

fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 3, 10, 15, 0, 0).unwrap()
}

fn classifier() -> ChannelClassifier {
    ChannelClassifier::new(ChannelRules::with_partner_patterns(["parceiro.com"]))
}

fn fixture_with_store(store: Arc<dyn OrderStore>) -> Fixture {
    let stock = Arc::new(CountingStock::default());
    let printer = Arc::new(FlakyPrinter::default());
    let couriers = Arc::new(MemoryCourierDirectory::new());
    let tz = chrono_tz::America::Sao_Paulo;
    let collaborators = Collaborators {
        store,
        stock: stock.clone(),
        couriers: couriers.clone(),
        numbers: Arc::new(MemoryOrderNumberGenerator::starting_at(100)),
        printer: printer.clone(),
    };
    let composer = ReceiptComposer::new(StoreInfo::default(), tz, classifier());
    let manager = OrdersManager::new(collaborators, classifier(), composer, tz)
        .with_establishment("est-1");
    Fixture {
        manager,
        stock,
        printer,
        couriers,
    }
}

fn fixture() -> Fixture {
    fixture_with_store(Arc::new(MemoryOrderStore::new()))
}

fn site_delivery_order() -> Order {
    let mut order = Order::new("", "", 0, now());
    order.source_domain = Some("loja.parceiro.com".to_string());
    order.order_type = OrderType::Delivery;
    order.customer_phone = Some("(11) 98888-7777".to_string());
    order.notes = Some("[2x Cheeseburger - R$20,00 Obs: sem cebola]".to_string());
    order.subtotal = 20.0;
    order.delivery_fee = 5.0;
    order
}

fn command(payload: OrderCommandPayload) -> OrderCommand {
    OrderCommand::new(payload).with_operator("Caixa").at(now())
}

fn accept(order_id: &str, courier_id: Option<&str>) -> OrderCommand {
    command(OrderCommandPayload::AcceptAndPrint {
        order_id: order_id.to_string(),
        courier_id: courier_id.map(str::to_string),
    })
}

// ========== Intake ==========

#[tokio::test]
async fn test_create_order_assigns_number_and_totals() {
    let f = fixture();
    let mut rx = f.manager.subscribe();

    let mut input = site_delivery_order();
    input.status = OrderStatus::Completed;
    input.subtotal = 0.0;
    input.items.push(OrderItem {
        product_id: None,
        product_name: "Cheeseburger".to_string(),
        quantity: 2,
        unit_price: 10.0,
        total_price: 0.0,
        notes: None,
        customizations: vec![],
    });

    let order = f.manager.create_order(input, now()).await.unwrap();
    assert!(!order.id.is_empty());
    assert_eq!(order.establishment_id, "est-1");
    assert_eq!(order.order_number, 101);
    assert_eq!(order.status, OrderStatus::Pending);
    assert_eq!(order.subtotal, 20.0);
    assert_eq!(order.total_amount, 25.0);

    let change = rx.try_recv().unwrap();
    assert_eq!(change.order_id, order.id);
    assert_eq!(change.kind, ChangeKind::Created);
}

#[tokio::test]
async fn test_create_order_store_failure_surfaces() {
    let f = fixture_with_store(Arc::new(ReadOnlyStore(MemoryOrderStore::new())));
    let result = f.manager.create_order(site_delivery_order(), now()).await;
    assert!(matches!(result, Err(OrderError::Store(_))));
}

// ========== Accept ==========

#[tokio::test]
async fn test_accept_partner_delivery_with_single_courier() {
    let f = fixture();
    f.couriers.set("est-1", vec![Courier::new("c1", "Ana")]);
    let order = f.manager.create_order(site_delivery_order(), now()).await.unwrap();
    let mut rx = f.manager.subscribe();

    let response = f.manager.execute_command(accept(&order.id, None)).await.unwrap();

    assert!(!response.is_degraded());
    assert_eq!(response.assigned_courier.as_ref().map(|c| c.name.as_str()), Some("Ana"));
    assert_eq!(response.order.courier_id.as_deref(), Some("c1"));
    assert_eq!(response.order.accepted_and_printed_at, Some(now()));
    assert_eq!(response.order.status, OrderStatus::Pending);
    // renumbered to the till sequence
    assert_eq!(response.order.order_number, 102);
    assert_eq!(response.task_ids.len(), 2);

    assert_eq!(f.stock.calls.load(Ordering::SeqCst), 1);
    let printed = f.printer.inner.printed();
    assert_eq!(printed.len(), 1);
    assert_eq!(printed[0].header.order_number, 102);
    assert_eq!(printed[0].items[0].name, "Cheeseburger");

    assert!(f.manager.outbox().failed().is_empty());
    assert_eq!(rx.try_recv().unwrap().kind, ChangeKind::Updated);
}

#[tokio::test]
async fn test_accept_requires_courier_choice_when_several_active() {
    let f = fixture();
    f.couriers.set("est-1", vec![Courier::new("c1", "Ana"), Courier::new("c2", "Beto")]);
    let order = f.manager.create_order(site_delivery_order(), now()).await.unwrap();

    let err = f.manager.execute_command(accept(&order.id, None)).await.unwrap_err();
    assert!(matches!(err, OrderError::CourierSelectionRequired { active: 2, .. }));
    // nothing committed, nothing run
    assert!(!f.manager.get_order(&order.id).await.unwrap().is_accepted());
    assert_eq!(f.stock.calls.load(Ordering::SeqCst), 0);

    let response = f.manager.execute_command(accept(&order.id, Some("c2"))).await.unwrap();
    assert_eq!(response.order.courier_name.as_deref(), Some("Beto"));
}

#[tokio::test]
async fn test_side_effect_failures_degrade_but_commit() {
    let f = fixture();
    f.stock.fail.store(true, Ordering::SeqCst);
    f.printer.offline.store(true, Ordering::SeqCst);
    let order = f.manager.create_order(site_delivery_order(), now()).await.unwrap();

    let response = f.manager.execute_command(accept(&order.id, None)).await.unwrap();
    assert!(response.is_degraded());
    let kinds: Vec<WarningKind> = response.warnings.iter().map(|w| w.kind).collect();
    assert_eq!(kinds, vec![WarningKind::StockDeduction, WarningKind::ReceiptPrint]);
    assert!(f.manager.get_order(&order.id).await.unwrap().is_accepted());
    assert_eq!(f.manager.outbox().failed().len(), 2);

    // back online: retry drains the outbox
    f.stock.fail.store(false, Ordering::SeqCst);
    f.printer.offline.store(false, Ordering::SeqCst);
    let retried = f.manager.retry_failed_tasks().await;
    assert_eq!(retried.len(), 2);
    assert!(retried.iter().all(|t| t.status == TaskStatus::Succeeded && t.attempts == 2));
    assert!(f.manager.outbox().failed().is_empty());
    assert_eq!(f.printer.inner.printed().len(), 1);
}

#[tokio::test]
async fn test_store_failure_on_commit_is_surfaced() {
    let seeded = MemoryOrderStore::new();
    let mut order = site_delivery_order();
    order.id = "o-1".to_string();
    order.establishment_id = "est-1".to_string();
    seeded.insert(order).await.unwrap();

    let f = fixture_with_store(Arc::new(ReadOnlyStore(seeded)));
    let err = f.manager.execute_command(accept("o-1", None)).await.unwrap_err();
    assert!(matches!(err, OrderError::Store(_)));
    // effects never ran
    assert_eq!(f.stock.calls.load(Ordering::SeqCst), 0);
    assert!(f.printer.inner.printed().is_empty());
}

#[tokio::test]
async fn test_duplicate_command_is_not_reexecuted() {
    let f = fixture();
    let order = f.manager.create_order(site_delivery_order(), now()).await.unwrap();

    let cmd = accept(&order.id, None);
    let first = f.manager.execute_command(cmd.clone()).await.unwrap();
    let second = f.manager.execute_command(cmd).await.unwrap();

    assert_eq!(first.task_ids, second.task_ids);
    assert_eq!(second.order.order_number, first.order.order_number);
    assert_eq!(f.stock.calls.load(Ordering::SeqCst), 1);
    assert_eq!(f.printer.inner.printed().len(), 1);
}

#[tokio::test]
async fn test_concurrent_duplicate_waits_for_first() {
    let f = fixture();
    let order = f.manager.create_order(site_delivery_order(), now()).await.unwrap();

    let cmd = accept(&order.id, None);
    let (first, second) = tokio::join!(
        f.manager.execute_command(cmd.clone()),
        f.manager.execute_command(cmd)
    );
    let (first, second) = (first.unwrap(), second.unwrap());

    assert_eq!(first.task_ids, second.task_ids);
    assert_eq!(first.order.order_number, second.order.order_number);
    assert_eq!(f.stock.calls.load(Ordering::SeqCst), 1);
    assert_eq!(f.printer.inner.printed().len(), 1);
}

#[tokio::test]
async fn test_expired_command_ids_and_tasks_are_pruned() {
    let f = fixture();
    let order = f.manager.create_order(site_delivery_order(), now()).await.unwrap();

    f.manager.execute_command(accept(&order.id, None)).await.unwrap();
    assert_eq!(f.manager.processed.len(), 1);
    assert_eq!(f.manager.outbox().len(), 2);

    let later = now() + Duration::hours(25);
    f.manager
        .execute_command(
            OrderCommand::new(OrderCommandPayload::MarkReady {
                order_id: order.id.clone(),
            })
            .at(later),
        )
        .await
        .unwrap();

    // Only the newer command is remembered; succeeded tasks of the accept are gone
    assert_eq!(f.manager.processed.len(), 1);
    assert!(f.manager.outbox().is_empty());
}

#[tokio::test]
async fn test_failed_tasks_survive_pruning() {
    let f = fixture();
    f.stock.fail.store(true, Ordering::SeqCst);
    let order = f.manager.create_order(site_delivery_order(), now()).await.unwrap();
    f.manager.execute_command(accept(&order.id, None)).await.unwrap();

    f.manager
        .execute_command(
            OrderCommand::new(OrderCommandPayload::MarkReady {
                order_id: order.id.clone(),
            })
            .at(now() + Duration::hours(25)),
        )
        .await
        .unwrap();

    let failed = f.manager.outbox().failed();
    assert_eq!(failed.len(), 1);
    assert_eq!(failed[0].kind, TaskKind::StockDeduction);
}

#[tokio::test]
async fn test_unknown_order() {
    let f = fixture();
    let cmd = accept("missing", None);
    let err = f.manager.execute_command(cmd.clone()).await.unwrap_err();
    assert!(matches!(err, OrderError::OrderNotFound(_)));

    // Failures are not remembered; the same id runs again
    assert!(f.manager.processed.is_empty());
    let err = f.manager.execute_command(cmd).await.unwrap_err();
    assert!(matches!(err, OrderError::OrderNotFound(_)));
}

// ========== Reject / edit / payment ==========

#[tokio::test]
async fn test_reject_rules() {
    let f = fixture();
    let order = f.manager.create_order(site_delivery_order(), now()).await.unwrap();

    let err = f
        .manager
        .execute_command(command(OrderCommandPayload::Reject {
            order_id: order.id.clone(),
            reason: " ".to_string(),
        }))
        .await
        .unwrap_err();
    assert!(matches!(err, OrderError::RejectionReasonRequired));

    let response = f
        .manager
        .execute_command(command(OrderCommandPayload::Reject {
            order_id: order.id.clone(),
            reason: "Fora da área".to_string(),
        }))
        .await
        .unwrap();
    assert!(response.order.is_rejected());
    assert_eq!(response.order.payment_status, PaymentStatus::Cancelled);

    let accepted = f.manager.create_order(site_delivery_order(), now()).await.unwrap();
    f.manager.execute_command(accept(&accepted.id, None)).await.unwrap();
    let err = f
        .manager
        .execute_command(command(OrderCommandPayload::Reject {
            order_id: accepted.id.clone(),
            reason: "Sem estoque".to_string(),
        }))
        .await
        .unwrap_err();
    assert!(matches!(err, OrderError::RejectAfterAcceptance(_)));
}

#[tokio::test]
async fn test_payment_method_edit_reprints_with_warning_on_failure() {
    let f = fixture();
    let order = f.manager.create_order(site_delivery_order(), now()).await.unwrap();
    f.printer.offline.store(true, Ordering::SeqCst);

    let response = f
        .manager
        .execute_command(command(OrderCommandPayload::Edit {
            order_id: order.id.clone(),
            changes: OrderEdit {
                payment_method: Some("Cartão de crédito".to_string()),
                ..Default::default()
            },
        }))
        .await
        .unwrap();

    assert_eq!(response.order.payment_method.as_deref(), Some("Cartão de crédito"));
    assert_eq!(response.warnings.len(), 1);
    let task = f.manager.outbox().get(&response.task_ids[0]).unwrap();
    assert_eq!(
        task.kind,
        TaskKind::ReceiptPrint {
            reason: ReceiptReason::PaymentMethodChanged
        }
    );
    assert_eq!(task.status, TaskStatus::Failed);
}

#[tokio::test]
async fn test_full_lifecycle_to_all_tab_state() {
    let f = fixture();
    let order = f.manager.create_order(site_delivery_order(), now()).await.unwrap();
    f.manager.execute_command(accept(&order.id, None)).await.unwrap();

    for payload in [
        OrderCommandPayload::StartPreparing { order_id: order.id.clone() },
        OrderCommandPayload::MarkReady { order_id: order.id.clone() },
        OrderCommandPayload::MarkCompleted { order_id: order.id.clone() },
        OrderCommandPayload::ConfirmPayment { order_id: order.id.clone() },
    ] {
        f.manager.execute_command(command(payload)).await.unwrap();
    }

    let stored = f.manager.get_order(&order.id).await.unwrap();
    assert_eq!(stored.status, OrderStatus::Completed);
    assert!(stored.is_fully_confirmed());

    let listed = f.manager.list_orders(now()).await.unwrap();
    assert_eq!(listed.len(), 1);
    assert!(f.manager.list_orders(now() + Duration::days(200)).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_receive_credit_freezes_interest() {
    let f = fixture();
    let mut input = Order::new("", "", 0, now());
    input.is_credit_sale = true;
    input.total_amount = 100.0;
    input.credit_interest_rate_per_day = Some(0.01);
    input.credit_due_date = NaiveDate::from_ymd_opt(2026, 3, 7);
    let order = f.manager.create_order(input, now()).await.unwrap();

    let response = f
        .manager
        .execute_command(command(OrderCommandPayload::ReceiveCredit {
            order_id: order.id.clone(),
        }))
        .await
        .unwrap();
    assert_eq!(response.order.credit_interest_amount, Some(3.0));
    assert_eq!(response.order.payment_status, PaymentStatus::Paid);
    assert!(!response.order.is_open_receivable());
}

#[tokio::test]
async fn test_non_fiscal_print_failure_is_warning() {
    let f = fixture();
    let order = f.manager.create_order(site_delivery_order(), now()).await.unwrap();
    let document = f.manager.receipt(&order.id).await.unwrap();
    let receipt = NonFiscalReceipt::new(document, "(11) 98888-7777", None).unwrap();

    assert!(f.manager.print_non_fiscal(&receipt).await.is_empty());
    f.printer.offline.store(true, Ordering::SeqCst);
    let warnings = f.manager.print_non_fiscal(&receipt).await;
    assert_eq!(warnings[0].kind, WarningKind::ReceiptPrint);
    assert_eq!(f.printer.inner.printed_non_fiscal().len(), 1);
}
