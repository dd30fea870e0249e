//! The user resource: list, retrieve, create, partial update and delete.
//!
//! Every operation runs the same pipeline:
//!
//! 1. coarse policy check (401/403 before anything is loaded)
//! 2. load the target record (404)
//! 3. object-level policy check against it
//! 4. validate the payload (400)
//! 5. mutate through a `Ctx<Permitted>`
//!
//! Responses are always [`UserOutput`]; the stored hash never leaves here.

use std::sync::Arc;

use http::Method;

use crate::audit::{AuditEvent, AuditEventKind, AuditLog, AuditOutcome};
use crate::config::Config;
use crate::context::Ctx;
use crate::error::{Error, Result, Violation};
use crate::gate::PolicyGate;
use crate::model::{
    NewUser, TextInput, User, UserChanges, UserDraft, UserId, UserInput, UserOutput, UserPatch,
};
use crate::password::{PasswordHash, PasswordHasher};
use crate::policy;
use crate::repository::UserRepository;
use crate::request::RequestMeta;
use crate::sanitizer::UserInputValidator;
use crate::state::{Permitted, Unchecked};
use crate::token::TokenStore;
use crate::{Secret, Tainted};

/// Handler for the user resource.
pub struct UserService {
    users: Arc<dyn UserRepository>,
    tokens: Arc<dyn TokenStore>,
    hasher: PasswordHasher,
    validator: UserInputValidator,
    audit: AuditLog,
}

impl UserService {
    /// # Errors
    ///
    /// `Error::Config` if the configuration fails validation or the hashing
    /// parameters are invalid.
    pub fn new(
        config: &Config,
        users: Arc<dyn UserRepository>,
        tokens: Arc<dyn TokenStore>,
        audit: AuditLog,
    ) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            users,
            tokens,
            hasher: PasswordHasher::new(config.hashing)?,
            validator: UserInputValidator::new(config.limits),
            audit,
        })
    }

    fn gate(&self, meta: &RequestMeta, method: Method) -> PolicyGate<'_> {
        PolicyGate::new(Ctx::<Unchecked>::new(meta, method)).with_audit(&self.audit)
    }

    fn load(&self, ctx_gate: &PolicyGate<'_>, id: UserId) -> Result<User> {
        ctx_gate.precheck()?;
        self.users.get(id).ok_or(Error::NotFound)
    }

    /// All users, ordered by id.
    pub fn list(&self, meta: &RequestMeta) -> Result<Vec<UserOutput>> {
        let ctx = self.gate(meta, Method::GET).build()?;
        let users: Vec<UserOutput> = self.users.list().iter().map(UserOutput::from).collect();
        ctx.log().debug(format_args!("listed {} users", users.len()));
        Ok(users)
    }

    /// One user by id.
    pub fn retrieve(&self, meta: &RequestMeta, id: UserId) -> Result<UserOutput> {
        let gate = self.gate(meta, Method::GET);
        let user = self.load(&gate, id)?;
        gate.with_target(&user).build()?;
        Ok(UserOutput::from(&user))
    }

    /// Creates a user. Elevated principals only.
    ///
    /// `username`, `password` and `is_active` are required. `id` and
    /// `is_superuser` are not writable; new users are never elevated.
    pub fn create(&self, meta: &RequestMeta, input: Tainted<UserInput>) -> Result<UserOutput> {
        let ctx = self.gate(meta, Method::POST).build()?;
        let new_user = self.validator.validate_create(input)?.into_inner();
        let user = self.insert(&ctx, new_user)?;
        Ok(UserOutput::from(&user))
    }

    fn hash_password(&self, ctx: &Ctx<Permitted>, password: &Secret<String>) -> Result<PasswordHash> {
        self.hasher.hash(password.expose_secret()).map_err(|e| {
            ctx.log().error(format_args!("password hashing failed: {}", e));
            self.audit.emit(
                AuditEvent::for_request(ctx, AuditEventKind::StateChange, AuditOutcome::Error)
                    .with_action(policy::action_name(ctx.method())),
            );
            e
        })
    }

    fn insert(&self, ctx: &Ctx<Permitted>, new_user: NewUser) -> Result<User> {
        let password_hash = self.hash_password(ctx, &new_user.password)?;
        let user = self.users.create(UserDraft {
            username: new_user.username,
            first_name: new_user.first_name,
            last_name: new_user.last_name,
            email: String::new(),
            password_hash,
            is_active: new_user.is_active,
            is_superuser: false,
        })?;

        ctx.log().info(format_args!("created user {} ({})", user.id, user.username));
        self.record_change(ctx, user.id);
        Ok(user)
    }

    /// Seeds an elevated account outside any request, e.g. at first start.
    ///
    /// The username and password go through the same validation as a
    /// create payload.
    ///
    /// # Errors
    ///
    /// `Error::Validation` for an invalid or taken username or password.
    pub fn create_superuser(&self, username: &str, password: Secret<String>) -> Result<UserOutput> {
        let input = UserInput {
            username: Some(TextInput::from(username)),
            password: Some(Secret::new(TextInput::from(password.expose_secret().as_str()))),
            is_active: Some(serde_json::Value::Bool(true)),
            ..UserInput::default()
        };
        let new_user = self.validator.validate_create(Tainted::new(input))?.into_inner();
        let password_hash = self.hasher.hash(new_user.password.expose_secret())?;
        let user = self.users.create(UserDraft {
            username: new_user.username,
            first_name: new_user.first_name,
            last_name: new_user.last_name,
            email: String::new(),
            password_hash,
            is_active: true,
            is_superuser: true,
        })?;

        tracing::info!(user_id = %user.id, username = %user.username, "superuser created");
        self.audit.emit(
            AuditEvent::new(
                "bootstrap",
                None::<String>,
                AuditEventKind::StateChange,
                AuditOutcome::Success,
            )
            .with_action("create_superuser")
            .with_target(user.id),
        );
        Ok(UserOutput::from(&user))
    }

    /// Changes only the supplied fields of a user. Self or elevated only.
    pub fn partial_update(
        &self,
        meta: &RequestMeta,
        id: UserId,
        input: Tainted<UserInput>,
    ) -> Result<UserOutput> {
        let gate = self.gate(meta, Method::PATCH);
        let target = self.load(&gate, id)?;
        let ctx = gate.with_target(&target).build()?;

        let changes = self.validator.validate_update(input)?.into_inner();
        let user = self.apply(&ctx, id, changes)?;
        Ok(UserOutput::from(&user))
    }

    fn apply(&self, ctx: &Ctx<Permitted>, id: UserId, changes: UserChanges) -> Result<User> {
        if !ctx.permits(id) {
            return Err(Violation::forbidden(policy::action_name(ctx.method())).into());
        }
        if changes.is_empty() {
            return self.users.get(id).ok_or(Error::NotFound);
        }

        let password_hash = match &changes.password {
            Some(password) => Some(self.hash_password(ctx, password)?),
            None => None,
        };
        let patch = UserPatch {
            username: changes.username,
            first_name: changes.first_name,
            last_name: changes.last_name,
            password_hash,
            is_active: changes.is_active,
            last_login: None,
        };
        let user = match self.users.update(id, patch) {
            Ok(user) => user,
            Err(Error::NotFound) => {
                ctx.log().warn(format_args!("user {} was deleted before the update", id));
                return Err(Error::NotFound);
            }
            Err(e) => return Err(e),
        };

        ctx.log().info(format_args!("updated user {}", id));
        self.record_change(ctx, id);
        Ok(user)
    }

    /// Deletes a user and revokes its token. Self or elevated only.
    pub fn delete(&self, meta: &RequestMeta, id: UserId) -> Result<()> {
        let gate = self.gate(meta, Method::DELETE);
        let target = self.load(&gate, id)?;
        let ctx = gate.with_target(&target).build()?;
        self.remove(&ctx, id)
    }

    fn remove(&self, ctx: &Ctx<Permitted>, id: UserId) -> Result<()> {
        if !ctx.permits(id) {
            return Err(Violation::forbidden(policy::action_name(ctx.method())).into());
        }
        if !self.users.delete(id) {
            ctx.log().warn(format_args!("user {} was deleted by a concurrent request", id));
            return Err(Error::NotFound);
        }
        self.tokens.revoke(id);

        ctx.log().info(format_args!("deleted user {}", id));
        self.record_change(ctx, id);
        Ok(())
    }

    fn record_change(&self, ctx: &Ctx<Permitted>, id: UserId) {
        self.audit.emit(
            AuditEvent::for_request(ctx, AuditEventKind::StateChange, AuditOutcome::Success)
                .with_action(policy::action_name(ctx.method()))
                .with_target(id),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ViolationKind;
    use crate::repository::InMemoryUserRepository;
    use crate::request::Principal;
    use crate::token::InMemoryTokenStore;
    use serde_json::json;

    struct Fixture {
        service: UserService,
        users: Arc<InMemoryUserRepository>,
        tokens: Arc<InMemoryTokenStore>,
        audit: AuditLog,
        admin: Principal,
        tom: Principal,
    }

    fn fixture() -> Fixture {
        let config = Config::for_testing();
        let users = Arc::new(InMemoryUserRepository::new());
        let tokens = Arc::new(InMemoryTokenStore::new());
        let audit = AuditLog::new();
        let hasher = PasswordHasher::new(config.hashing).unwrap();

        let mut principals = Vec::new();
        for (name, superuser) in [("jerry", true), ("tom", false)] {
            let user = users
                .create(UserDraft {
                    username: name.into(),
                    first_name: String::new(),
                    last_name: String::new(),
                    email: String::new(),
                    password_hash: hasher.hash("pw").unwrap(),
                    is_active: true,
                    is_superuser: superuser,
                })
                .unwrap();
            principals.push(Principal::from_user(&user));
        }
        let tom = principals.pop().unwrap();
        let admin = principals.pop().unwrap();

        let service = UserService::new(&config, users.clone(), tokens.clone(), audit.clone()).unwrap();
        Fixture {
            service,
            users,
            tokens,
            audit,
            admin,
            tom,
        }
    }

    fn as_user(p: &Principal) -> RequestMeta {
        RequestMeta::authenticated("req-test", p.clone())
    }

    fn anonymous() -> RequestMeta {
        RequestMeta::anonymous("req-anon")
    }

    fn payload(value: serde_json::Value) -> Tainted<UserInput> {
        Tainted::new(serde_json::from_value(value).unwrap())
    }

    fn violation_kind(result: Result<impl std::fmt::Debug>) -> ViolationKind {
        match result {
            Err(Error::Violation(v)) => v.kind,
            other => panic!("expected violation, got {:?}", other),
        }
    }

    #[test]
    fn unvalidated_config_is_rejected() {
        let mut config = Config::for_testing();
        config.limits.name_max_len = 0;
        let result = UserService::new(
            &config,
            Arc::new(InMemoryUserRepository::new()),
            Arc::new(InMemoryTokenStore::new()),
            AuditLog::new(),
        );
        assert!(matches!(result, Err(Error::Config(_))));
    }

    /// Loses every record between load and write, as a concurrent delete would.
    struct VanishingRepository(InMemoryUserRepository);

    impl UserRepository for VanishingRepository {
        fn create(&self, draft: UserDraft) -> Result<User> {
            self.0.create(draft)
        }
        fn get(&self, id: UserId) -> Option<User> {
            self.0.get(id)
        }
        fn find_by_username(&self, username: &str) -> Option<User> {
            self.0.find_by_username(username)
        }
        fn list(&self) -> Vec<User> {
            self.0.list()
        }
        fn update(&self, id: UserId, patch: UserPatch) -> Result<User> {
            self.0.delete(id);
            self.0.update(id, patch)
        }
        fn delete(&self, id: UserId) -> bool {
            self.0.delete(id);
            self.0.delete(id)
        }
    }

    #[test]
    fn concurrent_delete_surfaces_as_not_found() {
        let config = Config::for_testing();
        let users = Arc::new(VanishingRepository(InMemoryUserRepository::new()));
        let hasher = PasswordHasher::new(config.hashing).unwrap();
        let tom = users
            .create(UserDraft {
                username: "tom".into(),
                first_name: String::new(),
                last_name: String::new(),
                email: String::new(),
                password_hash: hasher.hash("pw").unwrap(),
                is_active: true,
                is_superuser: false,
            })
            .unwrap();
        let service = UserService::new(
            &config,
            users.clone(),
            Arc::new(InMemoryTokenStore::new()),
            AuditLog::new(),
        )
        .unwrap();
        let meta = as_user(&Principal::from_user(&tom));

        let result = service.partial_update(&meta, tom.id, payload(json!({"first_name": "T"})));
        assert!(matches!(result, Err(Error::NotFound)));

        let jerry = users
            .create(UserDraft {
                username: "jerry".into(),
                first_name: String::new(),
                last_name: String::new(),
                email: String::new(),
                password_hash: hasher.hash("pw").unwrap(),
                is_active: true,
                is_superuser: true,
            })
            .unwrap();
        let meta = as_user(&Principal::from_user(&jerry));
        assert!(matches!(service.delete(&meta, jerry.id), Err(Error::NotFound)));
    }

    #[test]
    fn anonymous_can_list_and_retrieve() {
        let f = fixture();
        let list = f.service.list(&anonymous()).unwrap();
        assert_eq!(list.len(), 2);
        assert_eq!(list[0].username, "jerry");

        let tom = f.service.retrieve(&anonymous(), UserId(2)).unwrap();
        assert_eq!(tom.username, "tom");
    }

    #[test]
    fn retrieve_missing_is_not_found() {
        let f = fixture();
        assert!(matches!(
            f.service.retrieve(&anonymous(), UserId(99)),
            Err(Error::NotFound)
        ));
    }

    #[test]
    fn admin_creates_non_elevated_user() {
        let f = fixture();
        let created = f
            .service
            .create(
                &as_user(&f.admin),
                payload(json!({
                    "username": "spike",
                    "password": "bone",
                    "is_active": "False",
                    "is_superuser": true
                })),
            )
            .unwrap();

        assert_eq!(created.id, UserId(3));
        assert!(!created.is_active);
        assert!(!created.is_superuser);

        let stored = f.users.get(UserId(3)).unwrap();
        assert_ne!(stored.password_hash.as_str(), "bone");
        assert!(stored.password_hash.as_str().starts_with("$argon2id$"));
    }

    #[test]
    fn create_denied_for_plain_and_anonymous() {
        let f = fixture();
        let body = json!({"username": "spike", "password": "bone", "is_active": true});

        let kind = violation_kind(f.service.create(&as_user(&f.tom), payload(body.clone())));
        assert_eq!(kind, ViolationKind::Forbidden { action: "create" });

        let kind = violation_kind(f.service.create(&anonymous(), payload(body)));
        assert_eq!(kind, ViolationKind::Unauthenticated);
        assert_eq!(f.users.len(), 2);
    }

    #[test]
    fn create_validates_before_storing() {
        let f = fixture();
        match f.service.create(&as_user(&f.admin), payload(json!({"first_name": "x"}))) {
            Err(Error::Validation(errors)) => {
                for field in ["username", "password", "is_active"] {
                    assert!(errors.get(field).is_some(), "missing error for {field}");
                }
            }
            other => panic!("expected validation error, got {:?}", other),
        }
        assert_eq!(f.users.len(), 2);
    }

    #[test]
    fn self_partial_update_changes_only_supplied_fields() {
        let f = fixture();
        let updated = f
            .service
            .partial_update(&as_user(&f.tom), f.tom.id, payload(json!({"last_name": "Cat"})))
            .unwrap();

        assert_eq!(updated.last_name, "Cat");
        assert_eq!(updated.username, "tom");
        assert_eq!(updated.first_name, "");
        assert!(updated.is_active);
    }

    #[test]
    fn partial_update_rehashes_password() {
        let f = fixture();
        let before = f.users.get(f.tom.id).unwrap().password_hash;
        f.service
            .partial_update(&as_user(&f.tom), f.tom.id, payload(json!({"password": "new"})))
            .unwrap();
        let after = f.users.get(f.tom.id).unwrap().password_hash;

        assert_ne!(before, after);
        let hasher = PasswordHasher::new(Config::for_testing().hashing).unwrap();
        assert!(hasher.verify("new", &after).unwrap());
    }

    #[test]
    fn update_of_other_user_is_forbidden() {
        let f = fixture();
        let kind = violation_kind(f.service.partial_update(
            &as_user(&f.tom),
            f.admin.id,
            payload(json!({"first_name": "x"})),
        ));
        assert_eq!(kind, ViolationKind::Forbidden { action: "partial_update" });
        assert_eq!(f.users.get(f.admin.id).unwrap().first_name, "");
    }

    #[test]
    fn anonymous_update_of_missing_user_is_unauthenticated() {
        let f = fixture();
        let kind = violation_kind(f.service.partial_update(
            &anonymous(),
            UserId(99),
            payload(json!({})),
        ));
        assert_eq!(kind, ViolationKind::Unauthenticated);
    }

    #[test]
    fn forbidden_check_runs_before_validation() {
        let f = fixture();
        let kind = violation_kind(f.service.partial_update(
            &as_user(&f.tom),
            f.admin.id,
            payload(json!({"username": ""})),
        ));
        assert_eq!(kind, ViolationKind::Forbidden { action: "partial_update" });
    }

    #[test]
    fn admin_may_update_and_delete_others() {
        let f = fixture();
        f.service
            .partial_update(&as_user(&f.admin), f.tom.id, payload(json!({"is_active": false})))
            .unwrap();
        assert!(!f.users.get(f.tom.id).unwrap().is_active);

        f.service.delete(&as_user(&f.admin), f.tom.id).unwrap();
        assert!(f.users.get(f.tom.id).is_none());
    }

    #[test]
    fn self_delete_revokes_token() {
        let f = fixture();
        let token = f.tokens.get_or_create(f.tom.id);
        let key = token.key.expose_secret().clone();

        f.service.delete(&as_user(&f.tom), f.tom.id).unwrap();
        assert!(f.tokens.resolve(&key).is_none());
    }

    #[test]
    fn delete_of_other_user_is_forbidden() {
        let f = fixture();
        let kind = violation_kind(f.service.delete(&as_user(&f.tom), f.admin.id));
        assert_eq!(kind, ViolationKind::Forbidden { action: "delete" });
        assert!(f.users.get(f.admin.id).is_some());
    }

    #[test]
    fn create_superuser_seeds_elevated_account() {
        let f = fixture();
        let admin = f
            .service
            .create_superuser("root", Secret::new("s3cret".to_string()))
            .unwrap();
        assert!(admin.is_superuser);
        assert!(admin.is_active);

        let result = f.service.create_superuser("root", Secret::new("x".to_string()));
        assert!(matches!(result, Err(Error::Validation(_))));

        let result = f.service.create_superuser("bad name", Secret::new("x".to_string()));
        assert!(matches!(result, Err(Error::Validation(_))));
    }

    #[test]
    fn writes_and_denials_are_audited() {
        let f = fixture();
        f.service
            .partial_update(&as_user(&f.tom), f.tom.id, payload(json!({"first_name": "T"})))
            .unwrap();
        let _ = f.service.delete(&as_user(&f.tom), f.admin.id);

        let events = f.audit.trail().events();
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].kind(), AuditEventKind::StateChange);
        assert_eq!(events[0].action(), Some("partial_update"));
        assert_eq!(events[0].target(), Some(f.tom.id));
        assert_eq!(events[1].kind(), AuditEventKind::Authorization);
        assert_eq!(events[1].outcome(), AuditOutcome::Denied);
    }
}
