//! Mock client implementation for unit tests.
use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard};

use super::{BaseUrlSource, ClientError, IdentityApi, ServiceAccount};

const SERVICE_EXISTS: &str =
    r#"{"code":409,"reason":"Conflict","message":"Unable to save config: Service already exists"}"#;

/// Mock client implementation for unit tests.
///
/// Objects live in memory and mimic the platform's responses: creating the
/// Base URL Source twice conflicts, missing objects are not found.
#[derive(Default)]
pub struct Client {
    state: Mutex<ClientState>,
}

impl Client {
    /// Store a Base URL Source as if it was created out of band.
    pub fn with_base_url_source(self, source: BaseUrlSource) -> Self {
        self.state().base_url = Some(source);
        self
    }

    /// Store a service account as if it was created out of band.
    pub fn insert_service_account(&self, account: ServiceAccount) {
        self.state().accounts.insert(account.id.clone(), account);
    }

    /// Remove the Base URL Source as if it was deleted out of band.
    pub fn remove_base_url_source(&self) {
        self.state().base_url = None;
    }

    /// Remove a service account as if it was deleted out of band.
    pub fn remove_service_account(&self, id: &str) {
        self.state().accounts.remove(id);
    }

    /// Current Base URL Source, if any.
    pub fn base_url_source(&self) -> Option<BaseUrlSource> {
        self.state().base_url.clone()
    }

    /// Current service account with the given id, if any.
    pub fn service_account(&self, id: &str) -> Option<ServiceAccount> {
        self.state().accounts.get(id).cloned()
    }

    /// Make the next API call fail with the given error.
    pub fn fail_next(&self, error: ClientError) {
        self.state().fail_next = Some(error);
    }

    /// Make create calls answer with an empty body.
    pub fn empty_create_responses(&self) {
        self.state().empty_create = true;
    }

    /// Names of the API calls made so far, in order.
    pub fn calls(&self) -> Vec<String> {
        self.state().calls.clone()
    }

    fn state(&self) -> MutexGuard<'_, ClientState> {
        self.state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn begin(&self, call: &str) -> Result<MutexGuard<'_, ClientState>, ClientError> {
        let mut state = self.state();
        state.calls.push(call.to_string());
        match state.fail_next.take() {
            Some(error) => Err(error),
            None => Ok(state),
        }
    }
}

#[async_trait::async_trait]
impl IdentityApi for Client {
    async fn get_base_url_source(&self) -> Result<BaseUrlSource, ClientError> {
        let state = self.begin("get_base_url_source")?;
        state
            .base_url
            .clone()
            .ok_or_else(|| ClientError::NotFound(String::new()))
    }

    async fn create_base_url_source(
        &self,
        source: &BaseUrlSource,
    ) -> Result<Option<BaseUrlSource>, ClientError> {
        let mut state = self.begin("create_base_url_source")?;
        if state.base_url.is_some() {
            return Err(ClientError::Conflict(SERVICE_EXISTS.to_string()));
        }
        state.base_url = Some(source.clone());
        if state.empty_create {
            return Ok(None);
        }
        Ok(state.base_url.clone())
    }

    async fn update_base_url_source(
        &self,
        source: &BaseUrlSource,
    ) -> Result<Option<BaseUrlSource>, ClientError> {
        let mut state = self.begin("update_base_url_source")?;
        if state.base_url.is_none() {
            return Err(ClientError::NotFound(String::new()));
        }
        state.base_url = Some(source.clone());
        Ok(state.base_url.clone())
    }

    async fn delete_base_url_source(&self) -> Result<(), ClientError> {
        let mut state = self.begin("delete_base_url_source")?;
        match state.base_url.take() {
            Some(_) => Ok(()),
            None => Err(ClientError::NotFound(String::new())),
        }
    }

    async fn read_service_account(&self, id: &str) -> Result<ServiceAccount, ClientError> {
        let state = self.begin("read_service_account")?;
        state
            .accounts
            .get(id)
            .cloned()
            .ok_or_else(|| ClientError::NotFound(String::new()))
    }

    async fn create_service_account(
        &self,
        account: &ServiceAccount,
    ) -> Result<ServiceAccount, ClientError> {
        let mut state = self.begin("create_service_account")?;
        state.next_id += 1;
        let mut account = account.clone();
        account.id = format!("svcacct-{}", state.next_id);
        state.accounts.insert(account.id.clone(), account.clone());
        Ok(account)
    }

    async fn update_service_account(
        &self,
        id: &str,
        account: &ServiceAccount,
    ) -> Result<ServiceAccount, ClientError> {
        let mut state = self.begin("update_service_account")?;
        if !state.accounts.contains_key(id) {
            return Err(ClientError::NotFound(String::new()));
        }
        let mut account = account.clone();
        account.id = id.to_string();
        state.accounts.insert(id.to_string(), account.clone());
        Ok(account)
    }

    async fn delete_service_account(&self, id: &str) -> Result<(), ClientError> {
        let mut state = self.begin("delete_service_account")?;
        match state.accounts.remove(id) {
            Some(_) => Ok(()),
            None => Err(ClientError::NotFound(String::new())),
        }
    }
}

/// Internal state to implement identity platform mocking.
#[derive(Default)]
struct ClientState {
    base_url: Option<BaseUrlSource>,
    accounts: BTreeMap<String, ServiceAccount>,
    next_id: u64,
    calls: Vec<String>,
    fail_next: Option<ClientError>,
    empty_create: bool,
}
