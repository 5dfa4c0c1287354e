//! Pipeline Tests - In-Memory End to End
//!
//! Order intake, token lifecycle and OTP behavior against the in-memory
//! adapters, including concurrent submissions to a single market.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use uuid::Uuid;

use rivon_core::adapters::memory::{
    MemoryOrderLog, MemoryOtpStore, MemoryTokenStore, MemoryUserStore,
};
use rivon_core::domain::ErrorKind;
use rivon_core::domain::identity::{AuthProvider, Identity, User};
use rivon_core::domain::order::OrderRequest;
use rivon_core::ports::mail::{MailDispatcher, OutboundMail};
use rivon_core::usecases::{
    AuthService, OrderIntake, OtpService, TokenService, TokenSettings,
};

const OTP_TTL: Duration = Duration::from_secs(300);

struct NullMailer;

#[async_trait::async_trait]
impl MailDispatcher for NullMailer {
    async fn send(&self, _mail: &OutboundMail) -> anyhow::Result<()> {
        Ok(())
    }
}

fn verified() -> Identity {
    Identity {
        id: Uuid::new_v4(),
        name: "Grace".into(),
        email: "grace@rivon.io".into(),
        verified: true,
        provider: AuthProvider::Credentials,
        photo: String::new(),
    }
}

fn order(market: Uuid, price: i64, quantity: i64, side: &str) -> OrderRequest {
    OrderRequest {
        market_id: market.to_string(),
        price,
        quantity,
        side: side.into(),
    }
}

fn tokens() -> TokenService {
    TokenService::new(
        Arc::new(MemoryTokenStore::new()),
        "pipeline-secret",
        TokenSettings {
            bcrypt_cost: 4,
            ..TokenSettings::default()
        },
    )
}

fn otp_service() -> OtpService {
    OtpService::new(Arc::new(MemoryOtpStore::new()), Arc::new(NullMailer), OTP_TTL, "Verify")
}

// ---- Order intake ----

#[tokio::test]
async fn test_valid_order_grows_log_by_one() {
    let intake = OrderIntake::new(Arc::new(MemoryOrderLog::new()), "ORDERS_");
    let market = Uuid::new_v4();
    let before = intake.log_len(market).await.unwrap();

    let placed = intake
        .place_order(&verified(), &order(market, 100, 5, "BUY"))
        .await
        .unwrap();

    assert!(!placed.order_id.is_nil());
    assert_eq!(placed.market_id, market);
    assert_eq!(intake.log_len(market).await.unwrap(), before + 1);

    let entries = intake.read_after(market, None, 10).await.unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].order.order_id, placed.order_id);
    assert_eq!(entries[0].position, placed.position);
}

#[tokio::test]
async fn test_zero_quantity_leaves_log_unchanged() {
    let intake = OrderIntake::new(Arc::new(MemoryOrderLog::new()), "ORDERS_");
    let market = Uuid::new_v4();
    intake
        .place_order(&verified(), &order(market, 100, 5, "SELL"))
        .await
        .unwrap();

    let err = intake
        .place_order(&verified(), &order(market, 100, 0, "BUY"))
        .await
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::BadRequest);
    assert_eq!(intake.log_len(market).await.unwrap(), 1);
}

#[tokio::test]
async fn test_markets_have_independent_logs() {
    let intake = OrderIntake::new(Arc::new(MemoryOrderLog::new()), "ORDERS_");
    let (a, b) = (Uuid::new_v4(), Uuid::new_v4());
    for _ in 0..3 {
        intake.place_order(&verified(), &order(a, 10, 1, "BUY")).await.unwrap();
    }
    intake.place_order(&verified(), &order(b, 10, 1, "SELL")).await.unwrap();

    assert_eq!(intake.log_len(a).await.unwrap(), 3);
    assert_eq!(intake.log_len(b).await.unwrap(), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_submissions_each_logged_once_in_append_order() {
    const N: usize = 64;
    let intake = Arc::new(OrderIntake::new(Arc::new(MemoryOrderLog::new()), "ORDERS_"));
    let market = Uuid::new_v4();

    let mut tasks = tokio::task::JoinSet::new();
    for i in 0..N {
        let intake = Arc::clone(&intake);
        let side = if i % 2 == 0 { "BUY" } else { "SELL" };
        let req = order(market, 100 + i as i64, 1, side);
        tasks.spawn(async move { intake.place_order(&verified(), &req).await });
    }

    let mut placed = Vec::with_capacity(N);
    while let Some(joined) = tasks.join_next().await {
        placed.push(joined.unwrap().unwrap());
    }

    assert_eq!(intake.log_len(market).await.unwrap(), N as u64);

    let entries = intake.read_after(market, None, N * 2).await.unwrap();
    assert_eq!(entries.len(), N);

    let logged: HashSet<Uuid> = entries.iter().map(|e| e.order.order_id).collect();
    let returned: HashSet<Uuid> = placed.iter().map(|p| p.order_id).collect();
    assert_eq!(logged.len(), N);
    assert_eq!(logged, returned);

    // Each acknowledged position points at its own order.
    for p in &placed {
        let entry = entries.iter().find(|e| e.position == p.position).unwrap();
        assert_eq!(entry.order.order_id, p.order_id);
    }
}

#[tokio::test]
async fn test_read_after_pages_through_log() {
    let intake = OrderIntake::new(Arc::new(MemoryOrderLog::new()), "ORDERS_");
    let market = Uuid::new_v4();
    for q in 1..=5 {
        intake.place_order(&verified(), &order(market, 50, q, "BUY")).await.unwrap();
    }

    let first = intake.read_after(market, None, 2).await.unwrap();
    assert_eq!(first.len(), 2);
    let rest = intake
        .read_after(market, Some(&first[1].position), 10)
        .await
        .unwrap();
    let quantities: Vec<i64> = rest.iter().map(|e| e.order.quantity).collect();
    assert_eq!(quantities, [3, 4, 5]);
}

// ---- Tokens ----

fn user() -> User {
    User {
        id: Uuid::new_v4(),
        kind: "user".into(),
        name: "Grace".into(),
        email: "grace@rivon.io".into(),
        verified: false,
        photo: "https://img/grace.png".into(),
        provider: AuthProvider::Google,
    }
}

#[tokio::test]
async fn test_access_token_round_trips_identity() {
    let tokens = tokens();
    let user = user();
    let refresh = tokens.issue_refresh_token(user.id).await.unwrap();
    let access = tokens.issue_access_token(&user, &refresh).await.unwrap();

    let identity = tokens.verify_access_token(&access).unwrap();
    assert_eq!(identity, user.identity());
}

#[tokio::test]
async fn test_revoked_refresh_token_never_yields_access() {
    let tokens = tokens();
    let user = user();
    let refresh = tokens.issue_refresh_token(user.id).await.unwrap();
    tokens.revoke(user.id, &refresh).await.unwrap();

    let err = tokens.issue_access_token(&user, &refresh).await.unwrap_err();
    assert_eq!(err.kind, ErrorKind::Unauthorized);
    let err = tokens.revoke(user.id, &refresh).await.unwrap_err();
    assert_eq!(err.kind, ErrorKind::Unauthorized);
}

#[tokio::test]
async fn test_revoke_touches_only_the_presented_session() {
    let tokens = tokens();
    let user = user();
    let phone = tokens.issue_refresh_token(user.id).await.unwrap();
    let laptop = tokens.issue_refresh_token(user.id).await.unwrap();

    tokio_test::assert_ok!(tokens.revoke(user.id, &phone).await);
    tokio_test::assert_ok!(tokens.issue_access_token(&user, &laptop).await);
}

#[tokio::test]
async fn test_refresh_token_bound_to_its_user() {
    let tokens = tokens();
    let (owner, other) = (user(), user());
    let refresh = tokens.issue_refresh_token(owner.id).await.unwrap();
    let err = tokens.issue_access_token(&other, &refresh).await.unwrap_err();
    assert_eq!(err.kind, ErrorKind::Unauthorized);
}

// ---- OTP ----

#[tokio::test(start_paused = true)]
async fn test_generate_within_window_returns_same_code() {
    let otp = otp_service();
    let first = otp.generate("user-7").await.unwrap();
    tokio::time::advance(Duration::from_secs(200)).await;
    let second = otp.generate("user-7").await.unwrap();
    assert_eq!(first, second);

    // The second call reset the expiry: 200s later the code is still live.
    tokio::time::advance(Duration::from_secs(200)).await;
    otp.verify("user-7", &first).await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn test_never_issued_or_expired_code_never_verifies() {
    let otp = otp_service();
    let err = otp.verify("nobody", "123456").await.unwrap_err();
    assert_eq!(err.kind, ErrorKind::NotFound);

    let code = otp.generate("user-8").await.unwrap();
    tokio::time::advance(OTP_TTL + Duration::from_secs(1)).await;
    let err = otp.verify("user-8", &code).await.unwrap_err();
    assert_eq!(err.kind, ErrorKind::NotFound);
}

#[tokio::test]
async fn test_mismatch_keeps_code_then_success_consumes_it() {
    let otp = otp_service();
    let code = otp.generate("user-9").await.unwrap();
    let wrong = if code == "000000" { "000001" } else { "000000" };

    let err = tokio_test::assert_err!(otp.verify("user-9", wrong).await);
    assert_eq!(err.kind, ErrorKind::UnprocessableData);

    otp.verify("user-9", &code).await.unwrap();
    let err = otp.verify("user-9", &code).await.unwrap_err();
    assert_eq!(err.kind, ErrorKind::NotFound);
}

// ---- Auth flow ----

#[tokio::test]
async fn test_sign_up_verify_refresh_then_order() {
    let users = Arc::new(MemoryUserStore::new());
    let tokens = Arc::new(tokens());
    let otp = Arc::new(otp_service());
    let auth = AuthService::new(users, Arc::clone(&tokens), Arc::clone(&otp), 4);
    let intake = OrderIntake::new(Arc::new(MemoryOrderLog::new()), "ORDERS_");
    let market = Uuid::new_v4();

    let session = auth.sign_up("lin@rivon.io", "Lin", "pa55word").await.unwrap();
    let stale = tokens.verify_access_token(&session.access_token).unwrap();
    let err = intake
        .place_order(&stale, &order(market, 100, 5, "BUY"))
        .await
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::Forbidden);

    let code = otp.generate(&stale.id.to_string()).await.unwrap();
    auth.verify_otp(&stale, &code).await.unwrap();

    let fresh = auth.refresh(stale.id, &session.refresh_token).await.unwrap();
    let identity = tokens.verify_access_token(&fresh).unwrap();
    assert!(identity.verified);
    intake
        .place_order(&identity, &order(market, 100, 5, "BUY"))
        .await
        .unwrap();
    assert_eq!(intake.log_len(market).await.unwrap(), 1);
}
