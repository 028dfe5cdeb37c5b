use lazy_static::lazy_static;
use tonic::{Request, transport::Channel};
use tokio_retry::{Retry, strategy::FixedInterval};
use std::{collections::HashMap, thread::JoinHandle};
use parking_lot::{Mutex, RawMutex, lock_api::MutexGuard};
use warden::grpc::{admin::admin_client::AdminClient, api::warden_client::WardenClient, common};

lazy_static! {
    // A mutex around the TestContext to ensure only one test can be using the service at a time.
    // This ensures tests do not corrupt the configuration, clock or data used by any other test.
    static ref TEST_MUTEX: Mutex<TestContext> = {
        let ctx = TestContext::default();
        ctx.config.apply();
        Mutex::new(ctx)
    };

    // A async runtime needed to run the service being tested in. This ensures when a test terminates,
    // the service is still running and available for another test.
    static ref RT: tokio::runtime::Runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_time()
        .enable_io()
        .build()
        .unwrap();
}

///
/// Test's should start by calling start_warden to obtain a lock on the TestContext.
///
/// This will give them a gRPC client to talk to a running Warden server.
///
#[derive(Default)]
pub struct TestContext {
    config: TestConfig,
    handle: Option<JoinHandle<()>>,
    client: Option<WardenClient<Channel>>,
    admin: Option<AdminClient<Channel>>,
}

impl TestContext {
    pub fn client(&mut self) -> &mut WardenClient<Channel> {
        self.client.as_mut().expect("Someone asked for a test client when there wasn't one")
    }

    pub fn admin(&mut self) -> &mut AdminClient<Channel> {
        self.admin.as_mut().expect("Someone asked for a test admin client when there wasn't one")
    }
}

#[derive(PartialEq)]
pub struct TestConfig {
    map: HashMap<&'static str, &'static str>
}

impl Default for TestConfig {
    fn default() -> Self {
        let mut map = HashMap::new();
        map.insert("ADDRESS", "127.0.0.1:50012");
        map.insert("STORE", "memory");
        map.insert("MAILER", "outbox");
        map.insert("TOKEN_SECRET", "integration-test-signing-key");
        map.insert("ARGON_MEMORY_KB", "256");
        map.insert("ARGON_ITERATIONS", "1");
        map.insert("ARGON_PARALLELISM", "1");
        map.insert("FRONTEND_URL", "http://warden.test");
        map.insert("MONGO_CREDENTIALS", "");
        map.insert("DISTRIBUTED_TRACING", "false");
        map.insert("JAEGER_ENDPOINT", "");
        map.insert("TLS_CERT", "");
        map.insert("TLS_KEY", "");
        map.insert("ADMIN_API", "true");

        Self {
            map
        }
    }
}

impl TestConfig {
    ///
    /// A deployment-like configuration with the admin service left off. It listens on its own
    /// port as a previously started server can't be stopped.
    ///
    pub fn without_admin() -> Self {
        let mut config = Self::default();
        config.map.insert("ADDRESS", "127.0.0.1:50013");
        config.map.insert("ADMIN_API", "");
        config
    }

    fn admin_enabled(&self) -> bool {
        self.map.get("ADMIN_API").map_or(false, |value| *value == "true")
    }

    ///
    /// Apply the configuration values to the local environment variables.
    ///
    fn apply(&self) {
        for entry in &self.map {
            if *entry.1 == String::default() {
                std::env::remove_var(entry.0);
            } else {
                std::env::set_var(entry.0, entry.1);
            }
        }
    }

    fn get(&self, key: &str) -> &'static str {
        self.map.get(key).copied().unwrap_or_else(|| panic!("No test config {}", key))
    }
}


///
/// Acquires a lock so only one test may run at a time and returns a TestContext.
///
/// Ensures the warden server is started with the specified configuration and that its clock
/// is following real time again.
///
pub async fn start_warden(config: TestConfig) -> MutexGuard<'static, RawMutex, TestContext> {
    let mut lock = TEST_MUTEX.lock();

    // If the configuration has changed - apply the new configuration. This allows tests
    // to run against a server instance where they control the configuration.
    if lock.config != config {
        lock.config = config;
        lock.config.apply();

        // Terminate and destroy any running server.
        lock.handle.take();

        // Destroy any previous test client.
        lock.client.take();
        lock.admin.take();
    }

    // If the server is not running, start it in a separate runtime instance. This ensures it will
    // survive test thread teardowns.
    if lock.handle.is_none() {
        let handle = RT.handle();
        lock.handle = Some(std::thread::spawn(move || {
            let _ignore = handle.block_on(async {
                warden::lib_main().await
            });
        }));
    }

    let address = lock.config.get("ADDRESS");

    if lock.client.is_none() {
        // Try to connect for up-to 1 minute.
        let client = Retry::spawn(FixedInterval::from_millis(100).take(600), move || {
                WardenClient::connect(format!("http://{}", address))
            })
            .await
            .expect("Unable to connect test client to server under test");

        let admin = Retry::spawn(FixedInterval::from_millis(100).take(600), move || {
                AdminClient::connect(format!("http://{}", address))
            })
            .await
            .expect("Unable to connect admin test client to server under test");

        lock.client = Some(client);
        lock.admin = Some(admin);
    }

    // Reset any fixed clock that a previous test may have applied.
    if lock.config.admin_enabled() {
        lock.admin().reset_time(Request::new(common::Empty::default()))
            .await
            .expect("Unable to reset the server clock");
    }

    lock
}


pub mod helper {
    use uuid::Uuid;
    use chrono::{DateTime, Utc};
    use tonic::{Request, Status, metadata::MetadataValue};
    use warden::grpc::{admin, api, common};
    use super::TestContext;

    pub const PASSWORD: &str = "Correct-Horse-42";

    ///
    /// Every test works with its own accounts so data left behind by other tests never matters.
    ///
    pub fn unique_email() -> String {
        format!("{}@warden.test", Uuid::new_v4().to_simple())
    }

    ///
    /// The numeric error code the service put in the status details.
    ///
    pub fn error_code(status: &Status) -> u32 {
        std::str::from_utf8(status.details())
            .ok()
            .and_then(|details| details.parse().ok())
            .unwrap_or_else(|| panic!("Status has no error code: {:?}", status))
    }

    pub fn bearer<T>(message: T, token: &str) -> Request<T> {
        let mut request = Request::new(message);
        let value: MetadataValue<_> = format!("Bearer {}", token).parse().expect("Token is not a valid header value");
        request.metadata_mut().insert("authorization", value);
        request
    }

    pub fn empty(token: &str) -> Request<common::Empty> {
        bearer(common::Empty::default(), token)
    }

    pub async fn set_time(now: DateTime<Utc>, ctx: &mut TestContext) {
        ctx.admin().set_time(Request::new(admin::NewTime { new_time: now.to_rfc3339() }))
            .await
            .expect("Unable to set the server clock");
    }

    pub async fn outbox(email: &str, ctx: &mut TestContext) -> Vec<admin::Mail> {
        ctx.admin().outbox(Request::new(admin::OutboxRequest { email: email.to_string() }))
            .await
            .expect("Unable to read the outbox")
            .into_inner()
            .mail
    }

    ///
    /// Wait for the nth mail (counting from 1) to reach the outbox and return the secret in its link.
    ///
    pub async fn secret_in_mail(email: &str, nth: usize, ctx: &mut TestContext) -> String {
        for _ in 0..100 {
            let mail = outbox(email, ctx).await;
            if let Some(mail) = mail.get(nth - 1) {
                let link = mail.body.lines()
                    .find(|line| line.contains("token="))
                    .expect("Mail has no link in it");

                return link.split("token=").nth(1).unwrap().trim().to_string()
            }
            tokio::time::sleep(std::time::Duration::from_millis(50)).await;
        }
        panic!("Mail {} never reached {}", nth, email);
    }

    pub async fn signup(email: &str, ctx: &mut TestContext) -> String {
        ctx.client().signup(Request::new(api::SignupRequest {
                email: email.to_string(),
                password: PASSWORD.to_string(),
                first_name: "Ada".to_string(),
                last_name: "Lovelace".to_string(),
                organization: "Analytical Engines".to_string(),
                job_role: String::default(),
            }))
            .await
            .expect("Signup failed")
            .into_inner()
            .account_id
    }

    ///
    /// Sign-up and verify a new account, returning its id.
    ///
    pub async fn active_account(email: &str, ctx: &mut TestContext) -> String {
        let account_id = signup(email, ctx).await;
        let token = secret_in_mail(email, 1, ctx).await;

        ctx.client().verify_email(Request::new(api::VerifyEmailRequest { token }))
            .await
            .expect("Verification failed");

        account_id
    }

    pub async fn login(email: &str, password: &str, ctx: &mut TestContext) -> Result<api::LoginResponse, Status> {
        ctx.client().login(Request::new(api::LoginRequest {
                email: email.to_string(),
                password: password.to_string(),
            }))
            .await
            .map(|response| response.into_inner())
    }

    pub async fn login_assert_ok(email: &str, ctx: &mut TestContext) -> String {
        login(email, PASSWORD, ctx).await.expect("Login failed").token
    }

    pub async fn session_status(token: &str, ctx: &mut TestContext) -> api::SessionStatusResponse {
        ctx.client().session_status(empty(token))
            .await
            .expect("Session status should never fail")
            .into_inner()
    }
}
