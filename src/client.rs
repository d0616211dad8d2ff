use std::path::PathBuf;
use std::time::{Duration, Instant};

use reqwest::Method;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, trace};

use crate::config::Config;
use crate::exchange_log::{ExchangeLogMode, ExchangeLogger};
use crate::protocol;
use crate::types::*;
use crate::{Error, Result};

/// Renew the access token this long before the vendor says it expires.
const TOKEN_EXPIRY_MARGIN: Duration = Duration::from_secs(60);

struct AccessToken {
    value: String,
    expires_at: Instant,
}

pub struct ComapClientBuilder {
    config: Config,
    log_mode: Option<ExchangeLogMode>,
    log_path: Option<PathBuf>,
    timeout: Option<Duration>,
}

impl ComapClientBuilder {
    pub fn new(config: Config) -> Self {
        Self {
            config,
            log_mode: None,
            log_path: None,
            timeout: None,
        }
    }

    pub fn exchange_log(mut self, mode: ExchangeLogMode, path: impl Into<PathBuf>) -> Self {
        self.log_mode = Some(mode);
        self.log_path = Some(path.into());
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn build(self) -> Result<ComapClient> {
        let mut http = reqwest::Client::builder();
        if let Some(timeout) = self.timeout {
            http = http.timeout(timeout);
        }
        let http = http.build()?;

        let logger = match (self.log_mode, self.log_path) {
            (Some(mode), Some(path)) => Some(ExchangeLogger::new(mode, &path).map_err(|e| {
                Error::Config(format!("cannot open exchange log {}: {e}", path.display()))
            })?),
            _ => None,
        };

        Ok(ComapClient {
            http,
            api_url: self.config.api_url.trim_end_matches('/').to_string(),
            housing_id: self.config.housing_id.clone(),
            config: self.config,
            token: None,
            logger,
        })
    }
}

/// Async client for the Comap Smart Home cloud API.
pub struct ComapClient {
    http: reqwest::Client,
    config: Config,
    api_url: String,
    housing_id: Option<String>,
    token: Option<AccessToken>,
    logger: Option<ExchangeLogger>,
}

impl ComapClient {
    pub fn builder(config: Config) -> ComapClientBuilder {
        ComapClientBuilder::new(config)
    }

    /// Housing the client is bound to, once known.
    pub fn housing_id(&self) -> Option<&str> {
        self.housing_id.as_deref()
    }

    // -- Reads --

    pub async fn get_housings(&mut self) -> Result<Vec<Housing>> {
        self.get(&protocol::housings_path()).await
    }

    /// The controlled housing: the configured one, else the first of the account.
    pub async fn get_housing_data(&mut self) -> Result<Housing> {
        let housings = self.get_housings().await?;
        let housing = match self.housing_id.as_deref() {
            Some(id) => housings.into_iter().find(|h| h.id == id),
            None => housings.into_iter().next(),
        }
        .ok_or_else(|| Error::Api {
            status: 404,
            message: "housing not found for this account".to_string(),
        })?;
        self.housing_id = Some(housing.id.clone());
        Ok(housing)
    }

    pub async fn get_custom_temperatures(&mut self) -> Result<CustomTemperatures> {
        let housing = self.housing().await?;
        self.get(&protocol::custom_temperatures_path(&housing)).await
    }

    pub async fn get_thermal_details(&mut self) -> Result<ThermalDetails> {
        let housing = self.housing().await?;
        self.get(&protocol::thermal_details_path(&housing)).await
    }

    pub async fn get_housing_connected_objects(&mut self) -> Result<Vec<ConnectedObject>> {
        let housing = self.housing().await?;
        self.get(&protocol::connected_objects_path(&housing)).await
    }

    pub async fn get_schedules(&mut self) -> Result<Vec<Schedule>> {
        let housing = self.housing().await?;
        self.get(&protocol::schedules_path(&housing)).await
    }

    pub async fn get_programs(&mut self) -> Result<Vec<Program>> {
        let housing = self.housing().await?;
        let list: ProgramList = self.get(&protocol::programs_path(&housing)).await?;
        Ok(list.programs)
    }

    pub async fn get_active_program(&mut self) -> Result<Program> {
        let housing = self.housing().await?;
        self.get(&protocol::active_program_path(&housing)).await
    }

    // -- Writes --

    /// Override a zone's schedule. Without a duration the vendor default applies.
    pub async fn set_temporary_instruction(
        &mut self,
        zone_id: &str,
        instruction: &Instruction,
        duration_minutes: Option<u32>,
    ) -> Result<Value> {
        let housing = self.housing().await?;
        let data = protocol::temporary_instruction_data(instruction, duration_minutes);
        self.log_command("set_temporary_instruction", Some(zone_id), Some(&data));
        self.send(
            Method::POST,
            &protocol::temporary_instruction_path(&housing, zone_id),
            Some(&data),
        )
        .await
    }

    pub async fn remove_temporary_instruction(&mut self, zone_id: &str) -> Result<Value> {
        let housing = self.housing().await?;
        self.log_command("remove_temporary_instruction", Some(zone_id), None);
        self.send(
            Method::DELETE,
            &protocol::temporary_instruction_path(&housing, zone_id),
            None,
        )
        .await
    }

    pub async fn set_custom_temperature(&mut self, slot: &str, value: f64) -> Result<Value> {
        let housing = self.housing().await?;
        let data = protocol::custom_temperature_data(slot, value);
        self.log_command("set_custom_temperature", None, Some(&data));
        self.send(
            Method::PATCH,
            &protocol::custom_temperatures_path(&housing),
            Some(&data),
        )
        .await
    }

    pub async fn set_schedule(&mut self, schedule_id: &str, zone_id: &str) -> Result<Value> {
        let housing = self.housing().await?;
        let data = protocol::zone_schedule_data(schedule_id);
        self.log_command("set_schedule", Some(zone_id), Some(&data));
        self.send(
            Method::PUT,
            &protocol::zone_schedule_path(&housing, zone_id),
            Some(&data),
        )
        .await
    }

    pub async fn set_program(&mut self, program_id: &str) -> Result<Value> {
        let housing = self.housing().await?;
        self.log_command("set_program", None, None);
        self.send(
            Method::POST,
            &protocol::activate_program_path(&housing, program_id),
            None,
        )
        .await
    }

    pub async fn turn_on(&mut self) -> Result<Value> {
        self.set_heating_system(true).await
    }

    pub async fn turn_off(&mut self) -> Result<Value> {
        self.set_heating_system(false).await
    }

    pub async fn set_holiday(&mut self) -> Result<Value> {
        let housing = self.housing().await?;
        self.log_command("set_holiday", None, None);
        self.send(Method::POST, &protocol::holiday_path(&housing), None)
            .await
    }

    pub async fn delete_holiday(&mut self) -> Result<Value> {
        let housing = self.housing().await?;
        self.log_command("delete_holiday", None, None);
        self.send(Method::DELETE, &protocol::holiday_path(&housing), None)
            .await
    }

    pub async fn set_absence(&mut self) -> Result<Value> {
        let housing = self.housing().await?;
        self.log_command("set_absence", None, None);
        self.send(Method::POST, &protocol::absence_path(&housing), None)
            .await
    }

    pub async fn delete_absence(&mut self) -> Result<Value> {
        let housing = self.housing().await?;
        self.log_command("delete_absence", None, None);
        self.send(Method::DELETE, &protocol::absence_path(&housing), None)
            .await
    }

    pub(crate) fn log_snapshot(&mut self, snapshot: &Value) {
        if let Some(ref mut logger) = self.logger {
            logger.log_snapshot(snapshot);
        }
    }

    // -- Helpers --

    async fn set_heating_system(&mut self, on: bool) -> Result<Value> {
        let housing = self.housing().await?;
        let data = protocol::heating_system_data(on);
        self.log_command(if on { "turn_on" } else { "turn_off" }, None, Some(&data));
        self.send(
            Method::POST,
            &protocol::heating_system_path(&housing),
            Some(&data),
        )
        .await
    }

    async fn housing(&mut self) -> Result<String> {
        if let Some(ref id) = self.housing_id {
            return Ok(id.clone());
        }
        Ok(self.get_housing_data().await?.id)
    }

    async fn access_token(&mut self) -> Result<String> {
        if let Some(ref token) = self.token
            && Instant::now() < token.expires_at
        {
            return Ok(token.value.clone());
        }

        debug!(url = %self.config.auth_url, "authenticating");
        let payload = protocol::auth_request(
            &self.config.client_id,
            &self.config.username,
            &self.config.password,
        );
        let resp = self
            .http
            .post(&self.config.auth_url)
            .header("Content-Type", protocol::COGNITO_CONTENT_TYPE)
            .header("X-Amz-Target", protocol::COGNITO_TARGET)
            .body(serde_json::to_string(&payload)?)
            .send()
            .await?;

        let status = resp.status();
        let body = resp.text().await?;
        if !status.is_success() {
            return Err(Error::Auth(format!("http {}: {body}", status.as_u16())));
        }

        let parsed: Value = serde_json::from_str(&body)?;
        let (value, expires_in) = protocol::parse_auth_response(&parsed)
            .ok_or_else(|| Error::Auth("no access token in response".to_string()))?;
        let lifetime = Duration::from_secs(expires_in).saturating_sub(TOKEN_EXPIRY_MARGIN);
        self.token = Some(AccessToken {
            value: value.clone(),
            expires_at: Instant::now() + lifetime,
        });
        Ok(value)
    }

    async fn get<T: DeserializeOwned>(&mut self, path: &str) -> Result<T> {
        let value = self.send(Method::GET, path, None).await?;
        Ok(serde_json::from_value(value)?)
    }

    async fn send(&mut self, method: Method, path: &str, body: Option<&Value>) -> Result<Value> {
        let token = self.access_token().await?;
        let url = format!("{}{}", self.api_url, path);
        trace!(method = %method, url = %url, "request");

        let mut request = self.http.request(method.clone(), &url).bearer_auth(token);
        if let Some(body) = body {
            request = request.json(body);
        }
        let resp = request.send().await?;
        let status = resp.status();

        if let Some(ref mut logger) = self.logger {
            logger.log_request(method.as_str(), path, status.as_u16());
        }

        let text = resp.text().await?;
        if !status.is_success() {
            debug!(status = status.as_u16(), path, "request rejected");
            return Err(Error::Api {
                status: status.as_u16(),
                message: text,
            });
        }
        if text.trim().is_empty() {
            return Ok(Value::Null);
        }
        Ok(serde_json::from_str(&text)?)
    }

    fn log_command(&mut self, action: &str, zone: Option<&str>, body: Option<&Value>) {
        debug!(action, zone = ?zone, "sending command");
        if let Some(ref mut logger) = self.logger {
            logger.log_command(action, zone, body);
        }
    }
}
