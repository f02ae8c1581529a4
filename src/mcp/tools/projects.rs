// Project (Use Case) tools
//
// list_projects, get_project, create_project, update_project, delete_project

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Map, Value};
use std::sync::Arc;

use super::{
    insert_opt, json_schema_integer, json_schema_object, json_schema_string, parse_args,
    resource_path, Tool, ToolRegistry,
};
use crate::error::ApiError;
use crate::registry::ClientRegistry;

const PROJECTS_PATH: &str = "/api/projects";
const DEFAULT_LIMIT: i64 = 20;
const MAX_LIMIT: i64 = 100;

/// Register all project tools
pub fn register(registry: &mut ToolRegistry, clients: Arc<ClientRegistry>) {
    registry.register(Arc::new(ListProjectsTool::new(clients.clone())));
    registry.register(Arc::new(GetProjectTool::new(clients.clone())));
    registry.register(Arc::new(CreateProjectTool::new(clients.clone())));
    registry.register(Arc::new(UpdateProjectTool::new(clients.clone())));
    registry.register(Arc::new(DeleteProjectTool::new(clients)));
}

/// Optional project fields, mapped to the VerifyWise payload names
#[derive(Debug, Default, Deserialize)]
struct ProjectFields {
    #[serde(default)]
    ai_risk_classification: Option<String>,
    #[serde(default)]
    type_of_high_risk_role: Option<String>,
    #[serde(default)]
    goal: Option<String>,
    #[serde(default)]
    last_updated_by: Option<String>,
}

impl ProjectFields {
    fn into_payload(self, name: Option<String>) -> Map<String, Value> {
        let mut payload = Map::new();
        insert_opt(&mut payload, "projectName", name);
        insert_opt(
            &mut payload,
            "aiRiskClassification",
            self.ai_risk_classification,
        );
        insert_opt(&mut payload, "typeOfHighRiskRole", self.type_of_high_risk_role);
        insert_opt(&mut payload, "goal", self.goal);
        insert_opt(&mut payload, "lastUpdatedBy", self.last_updated_by);
        payload
    }
}

fn project_field_properties() -> Map<String, Value> {
    let mut props = Map::new();
    props.insert(
        "ai_risk_classification".into(),
        json_schema_string("Risk classification (e.g. high, limited, minimal)"),
    );
    props.insert(
        "type_of_high_risk_role".into(),
        json_schema_string("Role descriptor for high-risk AI systems"),
    );
    props.insert(
        "goal".into(),
        json_schema_string("Description of the project's governance goal"),
    );
    props.insert(
        "last_updated_by".into(),
        json_schema_string("Email or ID of the user making this change"),
    );
    props
}

// === list_projects ===

pub struct ListProjectsTool {
    clients: Arc<ClientRegistry>,
}

impl ListProjectsTool {
    pub fn new(clients: Arc<ClientRegistry>) -> Self {
        Self { clients }
    }
}

#[derive(Deserialize)]
struct ListProjectsArgs {
    #[serde(default = "default_limit")]
    limit: i64,
}

fn default_limit() -> i64 {
    DEFAULT_LIMIT
}

#[async_trait]
impl Tool for ListProjectsTool {
    fn name(&self) -> &'static str {
        "list_projects"
    }

    fn description(&self) -> &'static str {
        "List AI governance projects (Use Cases) in VerifyWise. Returns project objects with id, name and status."
    }

    fn input_schema(&self) -> Value {
        json_schema_object(
            json!({
                "limit": json_schema_integer("Maximum number of projects to return", 1, MAX_LIMIT, DEFAULT_LIMIT)
            }),
            &[],
        )
    }

    fn read_only(&self) -> bool {
        true
    }

    async fn execute(&self, arguments: Value) -> Result<Value, ApiError> {
        let args: ListProjectsArgs = parse_args(arguments)?;
        if !(1..=MAX_LIMIT).contains(&args.limit) {
            return Err(ApiError::Validation(format!(
                "limit must be between 1 and {}",
                MAX_LIMIT
            )));
        }

        let client = self.clients.get_client().await?;
        let projects = client.get(PROJECTS_PATH).await?;

        Ok(match projects {
            Value::Array(mut items) => {
                items.truncate(args.limit as usize);
                Value::Array(items)
            }
            other => other,
        })
    }
}

// === get_project ===

pub struct GetProjectTool {
    clients: Arc<ClientRegistry>,
}

impl GetProjectTool {
    pub fn new(clients: Arc<ClientRegistry>) -> Self {
        Self { clients }
    }
}

#[derive(Deserialize)]
struct ProjectIdArgs {
    project_id: String,
}

#[async_trait]
impl Tool for GetProjectTool {
    fn name(&self) -> &'static str {
        "get_project"
    }

    fn description(&self) -> &'static str {
        "Get the details of a specific AI governance project by ID."
    }

    fn input_schema(&self) -> Value {
        json_schema_object(
            json!({ "project_id": json_schema_string("The unique identifier of the project") }),
            &["project_id"],
        )
    }

    fn read_only(&self) -> bool {
        true
    }

    async fn execute(&self, arguments: Value) -> Result<Value, ApiError> {
        let args: ProjectIdArgs = parse_args(arguments)?;
        let path = resource_path(PROJECTS_PATH, &args.project_id)?;

        let client = self.clients.get_client().await?;
        client.get(&path).await
    }
}

// === create_project ===

pub struct CreateProjectTool {
    clients: Arc<ClientRegistry>,
}

impl CreateProjectTool {
    pub fn new(clients: Arc<ClientRegistry>) -> Self {
        Self { clients }
    }
}

#[derive(Deserialize)]
struct CreateProjectArgs {
    name: String,
    #[serde(flatten)]
    fields: ProjectFields,
}

#[async_trait]
impl Tool for CreateProjectTool {
    fn name(&self) -> &'static str {
        "create_project"
    }

    fn description(&self) -> &'static str {
        "Create a new AI governance project (Use Case) in VerifyWise."
    }

    fn input_schema(&self) -> Value {
        let mut props = project_field_properties();
        props.insert("name".into(), json_schema_string("Project name. Must not be empty"));
        json_schema_object(Value::Object(props), &["name", "ai_risk_classification"])
    }

    async fn execute(&self, arguments: Value) -> Result<Value, ApiError> {
        let args: CreateProjectArgs = parse_args(arguments)?;
        if args.name.trim().is_empty() {
            return Err(ApiError::Validation("name must not be empty".to_string()));
        }
        if args.fields.ai_risk_classification.is_none() {
            return Err(ApiError::Validation(
                "ai_risk_classification is required".to_string(),
            ));
        }

        let payload = args.fields.into_payload(Some(args.name));

        let client = self.clients.get_client().await?;
        client.post(PROJECTS_PATH, Some(&payload)).await
    }
}

// === update_project ===

pub struct UpdateProjectTool {
    clients: Arc<ClientRegistry>,
}

impl UpdateProjectTool {
    pub fn new(clients: Arc<ClientRegistry>) -> Self {
        Self { clients }
    }
}

#[derive(Deserialize)]
struct UpdateProjectArgs {
    project_id: String,
    #[serde(default)]
    name: Option<String>,
    #[serde(flatten)]
    fields: ProjectFields,
}

#[async_trait]
impl Tool for UpdateProjectTool {
    fn name(&self) -> &'static str {
        "update_project"
    }

    fn description(&self) -> &'static str {
        "Update an existing AI governance project. Only the fields you pass are changed."
    }

    fn input_schema(&self) -> Value {
        let mut props = project_field_properties();
        props.insert(
            "project_id".into(),
            json_schema_string("ID of the project to update"),
        );
        props.insert("name".into(), json_schema_string("New project name"));
        json_schema_object(Value::Object(props), &["project_id"])
    }

    async fn execute(&self, arguments: Value) -> Result<Value, ApiError> {
        let args: UpdateProjectArgs = parse_args(arguments)?;
        let path = resource_path(PROJECTS_PATH, &args.project_id)?;
        let payload = args.fields.into_payload(args.name);

        let client = self.clients.get_client().await?;
        client.put(&path, Some(&payload)).await
    }
}

// === delete_project ===

pub struct DeleteProjectTool {
    clients: Arc<ClientRegistry>,
}

impl DeleteProjectTool {
    pub fn new(clients: Arc<ClientRegistry>) -> Self {
        Self { clients }
    }
}

#[async_trait]
impl Tool for DeleteProjectTool {
    fn name(&self) -> &'static str {
        "delete_project"
    }

    fn description(&self) -> &'static str {
        "Delete an AI governance project from VerifyWise."
    }

    fn input_schema(&self) -> Value {
        json_schema_object(
            json!({ "project_id": json_schema_string("ID of the project to delete") }),
            &["project_id"],
        )
    }

    async fn execute(&self, arguments: Value) -> Result<Value, ApiError> {
        let args: ProjectIdArgs = parse_args(arguments)?;
        let path = resource_path(PROJECTS_PATH, &args.project_id)?;

        let client = self.clients.get_client().await?;
        client.delete(&path).await
    }
}
