use async_trait::async_trait;
use common::{Application, ApplicationId, ApplicationResponse, NewApplication, SubmitApplication};
use reqwest::{Client, Method, RequestBuilder, Response, StatusCode};
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error)]
pub enum RmError {
    #[error("error de transporte con el resource manager: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("el resource manager respondió {status} en {url}: {body}")]
    Status {
        url: String,
        status: u16,
        body: String,
    },

    #[error("aplicación desconocida para el resource manager: {0}")]
    UnknownApplication(ApplicationId),

    #[error("respuesta inválida del resource manager: {0}")]
    InvalidResponse(String),

    #[error("id de aplicación inválido: '{0}'")]
    InvalidApplicationId(String),
}

/// El id va como segmento de URL y dentro del nombre `reef-<job>-<app>` de la
/// carpeta de staging: no puede tener '-', separadores de ruta ni ser `.`/`..`.
pub fn validate_application_id(application_id: &str) -> Result<(), RmError> {
    let bad = application_id.is_empty()
        || application_id.contains(['-', '/', '\\', '?', '#', '%'])
        || application_id == "."
        || application_id == "..";

    if bad {
        return Err(RmError::InvalidApplicationId(application_id.to_string()));
    }
    Ok(())
}

/// Lo que el cliente necesita del resource manager.
/// Puede ser el API REST, RPC o un fake en memoria para tests.
/// Ninguna implementación reintenta por su cuenta.
#[async_trait]
pub trait ResourceManager: Send + Sync {
    /// Pide un id de aplicación nuevo.
    async fn new_application(&self) -> Result<NewApplication, RmError>;

    /// Envía el descriptor; Ok significa que el RM lo aceptó/encoló.
    async fn submit_application(&self, request: &SubmitApplication) -> Result<(), RmError>;

    /// Estado actual de la aplicación (incluye el estado final).
    async fn get_application(&self, application_id: &str) -> Result<Application, RmError>;
}

#[derive(Debug, Clone)]
pub struct Credentials {
    pub user: String,
    pub password: String,
}

/// Cliente del API REST de YARN (/ws/v1/cluster/...).
#[derive(Debug, Clone)]
pub struct YarnRestClient {
    client: Client,
    base_url: String,
    credentials: Option<Credentials>,
}

impl YarnRestClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            credentials: None,
        }
    }

    pub fn with_credentials(mut self, credentials: Option<Credentials>) -> Self {
        self.credentials = credentials;
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn apps_url(&self) -> String {
        format!("{}/ws/v1/cluster/apps", self.base_url)
    }

    fn request(&self, method: Method, url: &str) -> RequestBuilder {
        let req = self.client.request(method, url);
        match &self.credentials {
            Some(c) => req.basic_auth(&c.user, Some(&c.password)),
            None => req,
        }
    }
}

async fn status_error(url: &str, resp: Response) -> RmError {
    let status = resp.status().as_u16();
    let body = resp.text().await.unwrap_or_default();
    RmError::Status {
        url: url.to_string(),
        status,
        body,
    }
}

#[async_trait]
impl ResourceManager for YarnRestClient {
    async fn new_application(&self) -> Result<NewApplication, RmError> {
        let url = format!("{}/new-application", self.apps_url());
        debug!("POST {}", url);

        let resp = self.request(Method::POST, &url).send().await?;
        if !resp.status().is_success() {
            return Err(status_error(&url, resp).await);
        }

        resp.json::<NewApplication>()
            .await
            .map_err(|e| RmError::InvalidResponse(format!("new-application: {e}")))
    }

    async fn submit_application(&self, request: &SubmitApplication) -> Result<(), RmError> {
        let url = self.apps_url();
        debug!("POST {} (aplicación {})", url, request.application_id);

        let resp = self
            .request(Method::POST, &url)
            .json(request)
            .send()
            .await?;

        // YARN contesta 202 Accepted con Location apuntando a la aplicación
        if !resp.status().is_success() {
            return Err(status_error(&url, resp).await);
        }
        Ok(())
    }

    async fn get_application(&self, application_id: &str) -> Result<Application, RmError> {
        validate_application_id(application_id)?;
        let url = format!("{}/{}", self.apps_url(), application_id);
        debug!("GET {}", url);

        let resp = self.request(Method::GET, &url).send().await?;
        if resp.status() == StatusCode::NOT_FOUND {
            return Err(RmError::UnknownApplication(application_id.to_string()));
        }
        if !resp.status().is_success() {
            return Err(status_error(&url, resp).await);
        }

        let body: ApplicationResponse = resp
            .json()
            .await
            .map_err(|e| RmError::InvalidResponse(format!("app {application_id}: {e}")))?;
        Ok(body.app)
    }
}
