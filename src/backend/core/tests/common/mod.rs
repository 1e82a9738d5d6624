//! Shared fixtures for the integration suites.

#![allow(dead_code)]

use std::sync::{Arc, OnceLock};

use taskhive_core::auth::password::hash_password;
use taskhive_core::db::memory::MemoryStore;
use taskhive_core::prelude::*;

/// RSA test keypair (fixtures only, never deployed).
pub const TEST_PRIVATE_KEY: &str = include_str!("../fixtures/jwt_private.pem");
pub const TEST_PUBLIC_KEY: &str = include_str!("../fixtures/jwt_public.pem");

/// The password every seeded user shares.
pub const PASSWORD: &str = "correct horse battery staple";

static PASSWORD_HASH: OnceLock<String> = OnceLock::new();

/// Argon2 is deliberately slow; hash the shared test password once.
pub fn password_hash() -> String {
    PASSWORD_HASH
        .get_or_init(|| hash_password(PASSWORD).expect("hashing test password"))
        .clone()
}

/// A fully wired environment over the in-memory store with RS256 keys.
pub struct TestEnv {
    pub store: Arc<MemoryStore>,
    pub issuer: TokenIssuer,
    pub validator: TokenValidator,
    pub audit: AuditRecorder,
    pub tasks: TaskService,
    pub orgs: OrgService,
    pub users: UserService,
}

pub fn test_keys() -> Arc<KeyMaterial> {
    Arc::new(
        KeyMaterial::rs256(Some(TEST_PRIVATE_KEY), TEST_PUBLIC_KEY)
            .expect("test key material"),
    )
}

pub fn env() -> TestEnv {
    env_with_ttl(chrono::Duration::hours(24))
}

pub fn env_with_ttl(token_ttl: chrono::Duration) -> TestEnv {
    let store = Arc::new(MemoryStore::new());
    let keys = test_keys();

    let issuer = TokenIssuer::new(keys.clone(), store.clone(), store.clone(), token_ttl);
    let validator = TokenValidator::new(keys, store.clone());
    let audit = AuditRecorder::new(store.clone());

    TestEnv {
        issuer,
        validator,
        tasks: TaskService::new(store.clone(), audit.clone()),
        orgs: OrgService::new(store.clone(), store.clone(), audit.clone()),
        users: UserService::new(store.clone(), audit.clone()),
        audit,
        store,
    }
}

pub fn ctx() -> RequestContext {
    RequestContext::system()
}

pub async fn seed_org(env: &TestEnv, name: &str) -> Organization {
    let org = Organization::new(name, None);
    OrganizationStore::insert(env.store.as_ref(), &org)
        .await
        .expect("seed org");
    org
}

pub async fn seed_user(
    env: &TestEnv,
    email: &str,
    organization_id: OrganizationId,
    role: Role,
) -> (User, Principal) {
    let user = User::new(email, email.split('@').next().unwrap(), password_hash(), organization_id, role);
    UserStore::insert(env.store.as_ref(), &user)
        .await
        .expect("seed user");
    let principal = user.to_principal();
    (user, principal)
}

pub fn new_task(title: &str) -> NewTask {
    NewTask {
        title: title.to_string(),
        description: None,
        category: TaskCategory::Work,
        priority: TaskPriority::Medium,
        assigned_to: None,
        due_date: None,
    }
}
