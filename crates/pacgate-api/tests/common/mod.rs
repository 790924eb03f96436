//! Shared fixtures for the pacgate-api integration tests.

#![allow(dead_code)]

use std::ops::RangeInclusive;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use pacgate_api::config::AppConfig;
use pacgate_api::middleware::metrics::ApiMetrics;
use pacgate_api::state::AppState;
use pacgate_api::store::memory::MemoryStore;
use pacgate_api::store::{DocumentFilter, StatusCounts, StatusStore, StoreError, MAX_PAGE_SIZE};
use pacgate_core::{
    ApiKey, Company, CompanyId, DocumentId, DocumentMapper, Environment, FiscalDocument,
    NewFiscalDocument, PacAccount,
};
use pacgate_pac_client::{AuthToken, PacApiError, PacCredentials, PacGateway, SubmissionReceipt};
use serde_json::{json, Value};

pub const COMPANY: &str = "acme";
pub const CUFE: &str = "FE0120000155596713-2-2015-5900012026101600000000421";

/// What the scripted PAC does.
#[derive(Debug, Clone)]
pub enum PacBehavior {
    Accept,
    FailAuth(&'static str),
    FailSubmit(&'static str),
}

/// In-process PAC double that counts calls.
#[derive(Debug)]
pub struct FakeGateway {
    behavior: PacBehavior,
    auth_calls: AtomicUsize,
    submit_calls: AtomicUsize,
}

impl FakeGateway {
    pub fn new(behavior: PacBehavior) -> Arc<Self> {
        Arc::new(Self {
            behavior,
            auth_calls: AtomicUsize::new(0),
            submit_calls: AtomicUsize::new(0),
        })
    }

    pub fn auth_calls(&self) -> usize {
        self.auth_calls.load(Ordering::SeqCst)
    }

    pub fn submit_calls(&self) -> usize {
        self.submit_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PacGateway for FakeGateway {
    async fn authenticate(
        &self,
        _env: Environment,
        _credentials: &PacCredentials,
    ) -> Result<AuthToken, PacApiError> {
        self.auth_calls.fetch_add(1, Ordering::SeqCst);
        match &self.behavior {
            PacBehavior::FailAuth(message) => Err(PacApiError::Rejected {
                endpoint: "POST /api/Autenticacion".into(),
                code: "401".into(),
                message: message.to_string(),
            }),
            _ => Ok(AuthToken::new("fake-session", None)),
        }
    }

    async fn submit(
        &self,
        _env: Environment,
        _token: &AuthToken,
        _document: &Value,
    ) -> Result<SubmissionReceipt, PacApiError> {
        self.submit_calls.fetch_add(1, Ordering::SeqCst);
        match &self.behavior {
            PacBehavior::Accept => Ok(SubmissionReceipt {
                cufe: CUFE.to_string(),
                message: "Documento recibido".to_string(),
                qr: None,
            }),
            PacBehavior::FailSubmit(message) | PacBehavior::FailAuth(message) => {
                Err(PacApiError::Rejected {
                    endpoint: "POST /api/Enviar".into(),
                    code: "102".into(),
                    message: message.to_string(),
                })
            }
        }
    }
}

pub fn company_id() -> CompanyId {
    CompanyId::new(COMPANY).unwrap()
}

pub fn demo_account() -> PacAccount {
    PacAccount {
        username: "155596713-2-2015".into(),
        password: "demo-password".into(),
        is_active: true,
        max_documents_per_month: None,
        documents_used_this_month: None,
    }
}

/// A company with a demo PAC account and one active API key.
pub fn seeded_company() -> (Company, String) {
    let mut company = Company::new(company_id(), "Acme S.A.");
    company.pac_config.set_account(Environment::Demo, demo_account());
    let key = ApiKey::generate();
    let raw = key.key.clone();
    company.api_keys.push(key);
    (company, raw)
}

/// A valid inbound PAC document.
pub fn valid_payload() -> Value {
    json!({
        "documento": {
            "codigoSucursalEmisor": "0000",
            "tipoSucursal": "1",
            "datosTransaccion": {
                "tipoEmision": "01",
                "tipoDocumento": "01",
                "numeroDocumentoFiscal": "0000042",
                "puntoFacturacionFiscal": "001",
                "fechaEmision": "2026-10-16T09:00:00-05:00",
                "cliente": {
                    "tipoClienteFE": "01",
                    "tipoContribuyente": "2",
                    "numeroRUC": "155596713-2-2015",
                    "digitoVerificadorRUC": "59",
                    "razonSocial": "Distribuidora Istmo S.A.",
                    "direccion": "Ciudad de Panama"
                }
            },
            "listaItems": {
                "item": [{
                    "descripcion": "Consultoria",
                    "cantidad": "1.00",
                    "precioUnitario": "100.00",
                    "precioItem": "100.00",
                    "valorTotal": "107.00",
                    "tasaITBMS": "01",
                    "valorITBMS": "7.00"
                }]
            },
            "totalesSubTotales": {
                "totalPrecioNeto": "100.00",
                "totalITBMS": "7.00",
                "totalFactura": "107.00",
                "nroItems": "1"
            }
        }
    })
}

/// How many documents the seeded tenant has.
pub async fn stored_documents(store: &MemoryStore) -> usize {
    let filter = DocumentFilter {
        limit: MAX_PAGE_SIZE,
        ..DocumentFilter::default()
    };
    store
        .list_documents(&company_id(), filter)
        .await
        .unwrap()
        .len()
}

/// Test harness: state over a memory store with one seeded company.
pub struct Harness {
    pub state: AppState,
    pub store: Arc<MemoryStore>,
    pub api_key: String,
}

pub async fn harness(gateway: Arc<dyn PacGateway>) -> Harness {
    harness_with_config(gateway, AppConfig::default()).await
}

pub async fn harness_with_config(gateway: Arc<dyn PacGateway>, config: AppConfig) -> Harness {
    let store = Arc::new(MemoryStore::new());
    let (company, api_key) = seeded_company();
    store.insert_company(company).await.unwrap();

    let state = AppState::new(
        config,
        store.clone(),
        gateway,
        DocumentMapper::with_embedded_schema().unwrap(),
        ApiMetrics::new().unwrap(),
    );
    Harness {
        state,
        store,
        api_key,
    }
}

/// Memory store whose document writes fail on demand.
///
/// Writes are numbered from 1 in call order; those in `failing` return a
/// database error and change nothing.
pub struct FlakyStore {
    inner: Arc<MemoryStore>,
    failing: RangeInclusive<usize>,
    document_writes: AtomicUsize,
}

impl FlakyStore {
    pub fn new(inner: Arc<MemoryStore>, failing: RangeInclusive<usize>) -> Self {
        Self {
            inner,
            failing,
            document_writes: AtomicUsize::new(0),
        }
    }

    pub fn document_writes(&self) -> usize {
        self.document_writes.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl StatusStore for FlakyStore {
    async fn insert_company(&self, company: Company) -> Result<Company, StoreError> {
        self.inner.insert_company(company).await
    }

    async fn get_company(&self, id: &CompanyId) -> Result<Option<Company>, StoreError> {
        self.inner.get_company(id).await
    }

    async fn update_company(&self, company: &Company) -> Result<Company, StoreError> {
        self.inner.update_company(company).await
    }

    async fn find_company_by_api_key(&self, key: &str) -> Result<Option<Company>, StoreError> {
        self.inner.find_company_by_api_key(key).await
    }

    async fn record_pac_usage(&self, id: &CompanyId, env: Environment) -> Result<(), StoreError> {
        self.inner.record_pac_usage(id, env).await
    }

    async fn create_document(&self, new: NewFiscalDocument) -> Result<FiscalDocument, StoreError> {
        self.inner.create_document(new).await
    }

    async fn get_document(&self, id: DocumentId) -> Result<Option<FiscalDocument>, StoreError> {
        self.inner.get_document(id).await
    }

    async fn list_documents(
        &self,
        company: &CompanyId,
        filter: DocumentFilter,
    ) -> Result<Vec<FiscalDocument>, StoreError> {
        self.inner.list_documents(company, filter).await
    }

    async fn count_documents_by_status(
        &self,
        company: &CompanyId,
    ) -> Result<StatusCounts, StoreError> {
        self.inner.count_documents_by_status(company).await
    }

    async fn update_document(
        &self,
        document: &FiscalDocument,
        expected_version: u64,
    ) -> Result<FiscalDocument, StoreError> {
        let write = self.document_writes.fetch_add(1, Ordering::SeqCst) + 1;
        if self.failing.contains(&write) {
            return Err(StoreError::Database(sqlx::Error::PoolTimedOut));
        }
        self.inner.update_document(document, expected_version).await
    }

    async fn ping(&self) -> Result<(), StoreError> {
        self.inner.ping().await
    }
}

/// Harness whose state writes documents through a [`FlakyStore`]. The
/// returned `store` is the memory store underneath, for inspection.
pub async fn flaky_harness(
    gateway: Arc<dyn PacGateway>,
    failing: RangeInclusive<usize>,
) -> (Harness, Arc<FlakyStore>) {
    let store = Arc::new(MemoryStore::new());
    let (company, api_key) = seeded_company();
    store.insert_company(company).await.unwrap();
    let flaky = Arc::new(FlakyStore::new(store.clone(), failing));

    let state = AppState::new(
        AppConfig::default(),
        flaky.clone(),
        gateway,
        DocumentMapper::with_embedded_schema().unwrap(),
        ApiMetrics::new().unwrap(),
    );
    (
        Harness {
            state,
            store,
            api_key,
        },
        flaky,
    )
}
