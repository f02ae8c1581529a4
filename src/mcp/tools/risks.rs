// Project risk tools
//
// list_risks, get_risk, create_risk, update_risk, delete_risk

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Map, Value};
use std::sync::Arc;

use super::{
    insert_opt, json_schema_object, json_schema_string, parse_args, resource_path, Tool,
    ToolRegistry,
};
use crate::error::ApiError;
use crate::models::RiskLevel;
use crate::registry::ClientRegistry;

const RISKS_PATH: &str = "/api/projectRisks";
const RISKS_BY_PROJECT_PATH: &str = "/api/projectRisks/by-projid";

/// Register all risk tools
pub fn register(registry: &mut ToolRegistry, clients: Arc<ClientRegistry>) {
    registry.register(Arc::new(ListRisksTool::new(clients.clone())));
    registry.register(Arc::new(GetRiskTool::new(clients.clone())));
    registry.register(Arc::new(CreateRiskTool::new(clients.clone())));
    registry.register(Arc::new(UpdateRiskTool::new(clients.clone())));
    registry.register(Arc::new(DeleteRiskTool::new(clients)));
}

fn severity_schema() -> Value {
    let levels: Vec<&str> = RiskLevel::ALL.iter().map(|l| l.as_str()).collect();
    json!({
        "type": "string",
        "description": "Risk severity (case-insensitive)",
        "enum": levels
    })
}

/// Parse and normalize an optional severity
fn parse_severity(severity: Option<String>) -> Result<Option<String>, ApiError> {
    severity
        .map(|s| s.parse::<RiskLevel>().map(|level| level.as_str().to_string()))
        .transpose()
}

// === list_risks ===

pub struct ListRisksTool {
    clients: Arc<ClientRegistry>,
}

impl ListRisksTool {
    pub fn new(clients: Arc<ClientRegistry>) -> Self {
        Self { clients }
    }
}

#[derive(Deserialize)]
struct ListRisksArgs {
    #[serde(default)]
    project_id: Option<String>,
}

#[async_trait]
impl Tool for ListRisksTool {
    fn name(&self) -> &'static str {
        "list_risks"
    }

    fn description(&self) -> &'static str {
        "List AI risks tracked in VerifyWise, optionally restricted to one project."
    }

    fn input_schema(&self) -> Value {
        json_schema_object(
            json!({ "project_id": json_schema_string("Only return risks for this project") }),
            &[],
        )
    }

    fn read_only(&self) -> bool {
        true
    }

    async fn execute(&self, arguments: Value) -> Result<Value, ApiError> {
        let args: ListRisksArgs = parse_args(arguments)?;
        let path = match args.project_id.as_deref() {
            Some(project_id) => resource_path(RISKS_BY_PROJECT_PATH, project_id)?,
            None => RISKS_PATH.to_string(),
        };

        let client = self.clients.get_client().await?;
        client.get(&path).await
    }
}

// === get_risk ===

pub struct GetRiskTool {
    clients: Arc<ClientRegistry>,
}

impl GetRiskTool {
    pub fn new(clients: Arc<ClientRegistry>) -> Self {
        Self { clients }
    }
}

#[derive(Deserialize)]
struct RiskIdArgs {
    risk_id: String,
}

#[async_trait]
impl Tool for GetRiskTool {
    fn name(&self) -> &'static str {
        "get_risk"
    }

    fn description(&self) -> &'static str {
        "Get the details of a specific AI risk by ID."
    }

    fn input_schema(&self) -> Value {
        json_schema_object(
            json!({ "risk_id": json_schema_string("The unique identifier of the risk") }),
            &["risk_id"],
        )
    }

    fn read_only(&self) -> bool {
        true
    }

    async fn execute(&self, arguments: Value) -> Result<Value, ApiError> {
        let args: RiskIdArgs = parse_args(arguments)?;
        let path = resource_path(RISKS_PATH, &args.risk_id)?;

        let client = self.clients.get_client().await?;
        client.get(&path).await
    }
}

// === create_risk ===

pub struct CreateRiskTool {
    clients: Arc<ClientRegistry>,
}

impl CreateRiskTool {
    pub fn new(clients: Arc<ClientRegistry>) -> Self {
        Self { clients }
    }
}

#[derive(Deserialize)]
struct CreateRiskArgs {
    project_id: String,
    title: String,
    description: String,
    severity: String,
    #[serde(default)]
    owner: Option<String>,
    #[serde(default)]
    due_date: Option<String>,
}

#[async_trait]
impl Tool for CreateRiskTool {
    fn name(&self) -> &'static str {
        "create_risk"
    }

    fn description(&self) -> &'static str {
        "Create a new AI risk for a project in VerifyWise."
    }

    fn input_schema(&self) -> Value {
        json_schema_object(
            json!({
                "project_id": json_schema_string("ID of the project the risk belongs to"),
                "title": json_schema_string("Short risk title. Must not be empty"),
                "description": json_schema_string("Detailed description of the risk"),
                "severity": severity_schema(),
                "owner": json_schema_string("Email or ID of the risk owner"),
                "due_date": json_schema_string("Mitigation due date (YYYY-MM-DD)")
            }),
            &["project_id", "title", "description", "severity"],
        )
    }

    async fn execute(&self, arguments: Value) -> Result<Value, ApiError> {
        let args: CreateRiskArgs = parse_args(arguments)?;
        if args.title.trim().is_empty() {
            return Err(ApiError::Validation("title must not be empty".to_string()));
        }
        let severity: RiskLevel = args.severity.parse()?;

        let mut payload = Map::new();
        payload.insert("projectId".into(), Value::String(args.project_id));
        payload.insert("riskName".into(), Value::String(args.title));
        payload.insert("riskDescription".into(), Value::String(args.description));
        payload.insert("severity".into(), Value::String(severity.to_string()));
        insert_opt(&mut payload, "owner", args.owner);
        insert_opt(&mut payload, "dueDate", args.due_date);

        let client = self.clients.get_client().await?;
        client.post(RISKS_PATH, Some(&payload)).await
    }
}

// === update_risk ===

pub struct UpdateRiskTool {
    clients: Arc<ClientRegistry>,
}

impl UpdateRiskTool {
    pub fn new(clients: Arc<ClientRegistry>) -> Self {
        Self { clients }
    }
}

#[derive(Deserialize)]
struct UpdateRiskArgs {
    risk_id: String,
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    severity: Option<String>,
    #[serde(default)]
    status: Option<String>,
    #[serde(default)]
    owner: Option<String>,
    #[serde(default)]
    due_date: Option<String>,
}

#[async_trait]
impl Tool for UpdateRiskTool {
    fn name(&self) -> &'static str {
        "update_risk"
    }

    fn description(&self) -> &'static str {
        "Update an existing AI risk. Only the fields you pass are changed."
    }

    fn input_schema(&self) -> Value {
        json_schema_object(
            json!({
                "risk_id": json_schema_string("ID of the risk to update"),
                "title": json_schema_string("New risk title"),
                "description": json_schema_string("New description"),
                "severity": severity_schema(),
                "status": json_schema_string("Risk status (e.g. open, mitigated, accepted)"),
                "owner": json_schema_string("Email or ID of the risk owner"),
                "due_date": json_schema_string("Mitigation due date (YYYY-MM-DD)")
            }),
            &["risk_id"],
        )
    }

    async fn execute(&self, arguments: Value) -> Result<Value, ApiError> {
        let args: UpdateRiskArgs = parse_args(arguments)?;
        let path = resource_path(RISKS_PATH, &args.risk_id)?;
        let severity = parse_severity(args.severity)?;

        let mut payload = Map::new();
        insert_opt(&mut payload, "riskName", args.title);
        insert_opt(&mut payload, "riskDescription", args.description);
        insert_opt(&mut payload, "severity", severity);
        insert_opt(&mut payload, "status", args.status);
        insert_opt(&mut payload, "owner", args.owner);
        insert_opt(&mut payload, "dueDate", args.due_date);

        let client = self.clients.get_client().await?;
        client.put(&path, Some(&payload)).await
    }
}

// === delete_risk ===

pub struct DeleteRiskTool {
    clients: Arc<ClientRegistry>,
}

impl DeleteRiskTool {
    pub fn new(clients: Arc<ClientRegistry>) -> Self {
        Self { clients }
    }
}

#[async_trait]
impl Tool for DeleteRiskTool {
    fn name(&self) -> &'static str {
        "delete_risk"
    }

    fn description(&self) -> &'static str {
        "Delete an AI risk from VerifyWise."
    }

    fn input_schema(&self) -> Value {
        json_schema_object(
            json!({ "risk_id": json_schema_string("ID of the risk to delete") }),
            &["risk_id"],
        )
    }

    async fn execute(&self, arguments: Value) -> Result<Value, ApiError> {
        let args: RiskIdArgs = parse_args(arguments)?;
        let path = resource_path(RISKS_PATH, &args.risk_id)?;

        let client = self.clients.get_client().await?;
        client.delete(&path).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::jwt::test_support::{make_jwt, now};
    use crate::auth::TokenManager;
    use crate::config::ClientConfig;
    use crate::http_client::ApiClient;
    use crate::transport::HttpTransport;
    use mockito::{Matcher, Server};
    use std::time::Duration;

    async fn clients_for(server: &mut Server) -> Arc<ClientRegistry> {
        let token = make_jwt(Some(now() + 3600.0));
        server
            .mock("POST", "/api/users/login")
            .with_status(200)
            .with_body(json!({ "token": token }).to_string())
            .create_async()
            .await;

        let config = ClientConfig {
            base_url: server.url(),
            email: "test@example.com".to_string(),
            password: "pw".to_string(),
            request_timeout: Duration::from_secs(5),
            max_retries: 1,
        };
        let transport = Arc::new(HttpTransport::new(config.request_timeout).unwrap());
        let tokens = Arc::new(TokenManager::new(transport.clone()));
        let client = ApiClient::with_parts(&config, transport, tokens);
        Arc::new(ClientRegistry::with_client(Arc::new(client)))
    }

    #[tokio::test]
    async fn test_list_risks_by_project() {
        let mut server = Server::new_async().await;
        let clients = clients_for(&mut server).await;
        let mock = server
            .mock("GET", "/api/projectRisks/by-projid/7")
            .with_status(200)
            .with_body(r#"[{"id": "r1"}]"#)
            .expect(1)
            .create_async()
            .await;

        let result = ListRisksTool::new(clients)
            .execute(json!({ "project_id": "7" }))
            .await
            .unwrap();

        assert_eq!(result, json!([{ "id": "r1" }]));
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_list_all_risks() {
        let mut server = Server::new_async().await;
        let clients = clients_for(&mut server).await;
        let mock = server
            .mock("GET", "/api/projectRisks")
            .with_status(200)
            .with_body("[]")
            .expect(1)
            .create_async()
            .await;

        ListRisksTool::new(clients).execute(json!({})).await.unwrap();
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_create_risk_normalizes_severity() {
        let mut server = Server::new_async().await;
        let clients = clients_for(&mut server).await;
        let mock = server
            .mock("POST", "/api/projectRisks")
            .match_body(Matcher::Json(json!({
                "projectId": "7",
                "riskName": "Bias in scoring",
                "riskDescription": "Model may discriminate",
                "severity": "high",
                "dueDate": "2025-01-31"
            })))
            .with_status(201)
            .with_body(r#"{"id": "r9"}"#)
            .expect(1)
            .create_async()
            .await;

        let result = CreateRiskTool::new(clients)
            .execute(json!({
                "project_id": "7",
                "title": "Bias in scoring",
                "description": "Model may discriminate",
                "severity": "HIGH",
                "due_date": "2025-01-31"
            }))
            .await
            .unwrap();

        assert_eq!(result["id"], "r9");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_create_risk_rejects_unknown_severity() {
        let mut server = Server::new_async().await;
        let clients = clients_for(&mut server).await;
        let mock = server
            .mock("POST", "/api/projectRisks")
            .expect(0)
            .create_async()
            .await;

        let err = CreateRiskTool::new(clients)
            .execute(json!({
                "project_id": "7",
                "title": "t",
                "description": "d",
                "severity": "severe"
            }))
            .await
            .unwrap_err();

        assert!(matches!(err, ApiError::Validation(ref m) if m.contains("severity")));
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_create_risk_rejects_blank_title() {
        let mut server = Server::new_async().await;
        let clients = clients_for(&mut server).await;

        let err = CreateRiskTool::new(clients)
            .execute(json!({
                "project_id": "7",
                "title": "",
                "description": "d",
                "severity": "low"
            }))
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::Validation(ref m) if m.contains("title")));
    }

    #[tokio::test]
    async fn test_update_risk_partial_payload() {
        let mut server = Server::new_async().await;
        let clients = clients_for(&mut server).await;
        let mock = server
            .mock("PUT", "/api/projectRisks/r1")
            .match_body(Matcher::Json(json!({
                "severity": "critical",
                "status": "mitigated"
            })))
            .with_status(200)
            .with_body(r#"{"id": "r1"}"#)
            .expect(1)
            .create_async()
            .await;

        UpdateRiskTool::new(clients)
            .execute(json!({
                "risk_id": "r1",
                "severity": "Critical",
                "status": "mitigated"
            }))
            .await
            .unwrap();
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_delete_risk_server_error() {
        let mut server = Server::new_async().await;
        let clients = clients_for(&mut server).await;
        server
            .mock("DELETE", "/api/projectRisks/r1")
            .with_status(500)
            .with_body("Internal Server Error")
            .create_async()
            .await;

        let err = DeleteRiskTool::new(clients)
            .execute(json!({ "risk_id": "r1" }))
            .await
            .unwrap_err();
        assert_eq!(err.status(), Some(500));
    }

    #[test]
    fn test_parse_severity() {
        assert_eq!(parse_severity(None).unwrap(), None);
        assert_eq!(
            parse_severity(Some("Medium".to_string())).unwrap(),
            Some("medium".to_string())
        );
        assert!(parse_severity(Some("x".to_string())).is_err());
    }
}
