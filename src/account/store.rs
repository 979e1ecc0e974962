/// Account registration, sessions and balance custody.
// region:    --- Imports
use super::model::{Role, User};
use crate::auction::model::{Amount, UserId};
use crate::clock::Clock;
use crate::error::{MarketError, StorageError};
use crate::new_id;
use crate::storage::{load_typed, Storage, WriteBatch, CURRENT_USER_KEY, USERS_KEY};
use std::sync::Arc;
use tracing::{info, warn};
// endregion: --- Imports

// region:    --- Policies
/// Role given to a freshly registered account.
///
/// The literal username `admin` becomes an administrator; everybody else is
/// a regular user. Kept in one place so a real authorization flow can
/// replace it.
pub fn determine_initial_role(username: &str) -> Role {
    if username == "admin" {
        Role::Admin
    } else {
        Role::User
    }
}

/// Credential check consulted by `login`.
pub trait CredentialVerifier: Send + Sync {
    fn verify(&self, user: &User, password: &str) -> bool;

    /// Called once when an account is registered.
    fn enroll(&self, _user: &User, _password: &str) {}
}

/// Accepts every password. Passwords are never stored.
#[derive(Debug, Default, Clone, Copy)]
pub struct AcceptAnyPassword;

impl CredentialVerifier for AcceptAnyPassword {
    fn verify(&self, _user: &User, _password: &str) -> bool {
        true
    }
}
// endregion: --- Policies

// region:    --- Staged Accounts
/// Working copy of the account list used while an operation is being
/// prepared. Nothing is visible until the owning store installs it.
#[derive(Debug, Clone)]
pub(crate) struct StagedAccounts {
    users: Vec<User>,
}

impl StagedAccounts {
    pub(crate) fn get(&self, user_id: &str) -> Option<&User> {
        self.users.iter().find(|u| u.id == user_id)
    }

    /// Adds `amount` to the balance. Returns false for unknown accounts and
    /// `InvalidAmount` when the balance would overflow.
    pub(crate) fn credit(&mut self, user_id: &str, amount: Amount) -> Result<bool, MarketError> {
        match self.users.iter_mut().find(|u| u.id == user_id) {
            Some(user) => {
                user.balance = user
                    .balance
                    .checked_add(amount)
                    .ok_or(MarketError::InvalidAmount)?;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    pub(crate) fn set_balance(&mut self, user_id: &str, balance: Amount) -> bool {
        match self.users.iter_mut().find(|u| u.id == user_id) {
            Some(user) => {
                user.balance = balance;
                true
            }
            None => false,
        }
    }
}
// endregion: --- Staged Accounts

// region:    --- User Store
pub struct UserStore {
    users: Vec<User>,
    current: Option<UserId>,
    storage: Arc<dyn Storage>,
    clock: Arc<dyn Clock>,
    credentials: Arc<dyn CredentialVerifier>,
    starting_balance: Amount,
}

impl UserStore {
    /// Loads accounts and the persisted session.
    pub async fn load(
        storage: Arc<dyn Storage>,
        clock: Arc<dyn Clock>,
        starting_balance: Amount,
    ) -> Self {
        let mut store = Self {
            users: Vec::new(),
            current: None,
            storage,
            clock,
            credentials: Arc::new(AcceptAnyPassword),
            starting_balance,
        };
        store.reload().await;
        store
    }

    pub fn with_credentials(mut self, credentials: Arc<dyn CredentialVerifier>) -> Self {
        self.credentials = credentials;
        self
    }

    /// Replaces memory with what storage holds.
    pub async fn reload(&mut self) {
        self.users = load_typed(&*self.storage, USERS_KEY)
            .await
            .unwrap_or_default();

        let session: Option<User> = load_typed(&*self.storage, CURRENT_USER_KEY).await;
        self.current = match session {
            Some(user) if self.users.iter().any(|u| u.id == user.id) => Some(user.id),
            Some(user) => {
                warn!(
                    "{:<12} --> session for unknown account {} dropped",
                    "Account", user.id
                );
                None
            }
            None => None,
        };
        info!(
            "{:<12} --> loaded {} accounts, session: {:?}",
            "Account",
            self.users.len(),
            self.current
        );
    }

    pub fn users(&self) -> &[User] {
        &self.users
    }

    pub fn find(&self, user_id: &str) -> Option<&User> {
        self.users.iter().find(|u| u.id == user_id)
    }

    pub fn current_user(&self) -> Option<&User> {
        self.current.as_deref().and_then(|id| self.find(id))
    }

    /// Current session user, or `NotAuthenticated`.
    pub fn require_user(&self) -> Result<&User, MarketError> {
        self.current_user().ok_or(MarketError::NotAuthenticated)
    }

    /// 1. Register
    pub async fn register(
        &mut self,
        username: &str,
        email: &str,
        password: &str,
    ) -> Result<User, MarketError> {
        if self
            .users
            .iter()
            .any(|u| u.username == username || u.email == email)
        {
            info!("{:<12} --> duplicate registration: {}", "Account", username);
            return Err(MarketError::AccountExists);
        }

        let user = User {
            id: new_id(),
            username: username.to_string(),
            email: email.to_string(),
            balance: self.starting_balance,
            role: determine_initial_role(username),
            created_at: self.clock.now(),
        };

        let mut users = self.users.clone();
        users.push(user.clone());

        let mut batch = WriteBatch::new();
        batch.put(USERS_KEY, &users)?;
        batch.put(CURRENT_USER_KEY, &user)?;
        self.storage.apply(batch).await?;

        self.credentials.enroll(&user, password);
        self.users = users;
        self.current = Some(user.id.clone());
        info!(
            "{:<12} --> registered {} ({:?})",
            "Account", user.username, user.role
        );
        Ok(user)
    }

    /// 2. Login
    pub async fn login(&mut self, username: &str, password: &str) -> Result<User, MarketError> {
        let user = self
            .users
            .iter()
            .find(|u| u.username == username)
            .cloned()
            .ok_or_else(|| MarketError::UnknownAccount(username.to_string()))?;

        if !self.credentials.verify(&user, password) {
            warn!("{:<12} --> credentials rejected for {}", "Account", username);
            return Err(MarketError::InvalidCredentials);
        }

        let mut batch = WriteBatch::new();
        batch.put(CURRENT_USER_KEY, &user)?;
        self.storage.apply(batch).await?;

        self.current = Some(user.id.clone());
        info!("{:<12} --> logged in {}", "Account", username);
        Ok(user)
    }

    /// 3. Logout
    pub async fn logout(&mut self) -> Result<(), MarketError> {
        let mut batch = WriteBatch::new();
        batch.delete(CURRENT_USER_KEY);
        self.storage.apply(batch).await?;

        if let Some(id) = self.current.take() {
            info!("{:<12} --> logged out {}", "Account", id);
        }
        Ok(())
    }

    /// 4. Balance update
    /// Overwrites the session user's balance with an absolute value.
    pub async fn update_balance(&mut self, new_balance: Amount) -> Result<User, MarketError> {
        let user_id = self.require_user()?.id.clone();

        let mut staged = self.stage();
        staged.set_balance(&user_id, new_balance);

        let mut batch = WriteBatch::new();
        self.write_into(&staged, &mut batch)?;
        self.storage.apply(batch).await?;
        self.install(staged);

        info!(
            "{:<12} --> balance of {} set to {}",
            "Account", user_id, new_balance
        );
        self.require_user().cloned()
    }

    pub(crate) fn stage(&self) -> StagedAccounts {
        StagedAccounts {
            users: self.users.clone(),
        }
    }

    /// Stages the account list and the session record of `staged`.
    pub(crate) fn write_into(
        &self,
        staged: &StagedAccounts,
        batch: &mut WriteBatch,
    ) -> Result<(), StorageError> {
        batch.put(USERS_KEY, &staged.users)?;
        if let Some(user) = self.current.as_deref().and_then(|id| staged.get(id)) {
            batch.put(CURRENT_USER_KEY, user)?;
        }
        Ok(())
    }

    pub(crate) fn install(&mut self, staged: StagedAccounts) {
        self.users = staged.users;
    }
}
// endregion: --- User Store
