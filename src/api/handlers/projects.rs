use crate::AppState;
use crate::api::models::projects::{HeadProjectQuery, ListProjectsQuery, ProjectRequest, ProjectResponse, ProjectUpdateRequest};
use crate::auth::Principal;
use crate::errors::{Error, Result};
use crate::project::controller::{CreateProject, ListProjects, ProjectLifecycleController, UpdateProject};
use crate::project::deletable::Deletability;
use crate::project::summary::ProjectSummary;
use crate::types::ProjectId;
use axum::{
    Json,
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode, header},
    response::{IntoResponse, Response},
};

fn parse_id(id: ProjectId) -> Result<ProjectId> {
    if id <= 0 {
        return Err(Error::BadRequest {
            message: format!("invalid project id: {id}"),
        });
    }
    Ok(id)
}

#[utoipa::path(
    post,
    path = "/projects",
    tag = "projects",
    summary = "Create a project",
    request_body = ProjectRequest,
    responses(
        (status = 201, description = "Project created, Location header holds its URL"),
        (status = 400, description = "Invalid name or metadata"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Project creation restricted to administrators"),
        (status = 409, description = "Project name already taken"),
        (status = 500, description = "Internal server error")
    )
)]
#[tracing::instrument(skip_all)]
pub async fn create_project(
    State(state): State<AppState>,
    principal: Principal,
    Json(request): Json<ProjectRequest>,
) -> Result<Response> {
    let controller = ProjectLifecycleController::new(&state);
    let record = controller
        .create(
            &principal,
            CreateProject {
                name: request.name,
                metadata: request.metadata,
                public: request.public,
                storage_limit: request.storage_limit,
                cve_allowlist: request.cve_allowlist,
            },
        )
        .await?;

    let mut headers = HeaderMap::new();
    if let Ok(location) = format!("/api/projects/{}", record.project_id).parse() {
        headers.insert(header::LOCATION, location);
    }
    Ok((StatusCode::CREATED, headers).into_response())
}

#[utoipa::path(
    head,
    path = "/projects",
    tag = "projects",
    summary = "Probe for a project by name",
    params(HeadProjectQuery),
    responses(
        (status = 200, description = "Project exists"),
        (status = 400, description = "Missing project_name parameter"),
        (status = 401, description = "Unauthorized"),
        (status = 404, description = "No project with this name"),
        (status = 500, description = "Internal server error")
    )
)]
#[tracing::instrument(skip_all)]
pub async fn head_project(
    State(state): State<AppState>,
    principal: Principal,
    Query(query): Query<HeadProjectQuery>,
) -> Result<StatusCode> {
    let name = query.project_name.filter(|n| !n.is_empty()).ok_or_else(|| Error::BadRequest {
        message: "project_name is required".to_string(),
    })?;
    let controller = ProjectLifecycleController::new(&state);
    controller.head(&principal, &name).await?;
    Ok(StatusCode::OK)
}

#[utoipa::path(
    get,
    path = "/projects/{id}",
    tag = "projects",
    summary = "Get a project",
    params(("id" = i64, Path, description = "Project ID")),
    responses(
        (status = 200, description = "Project details", body = ProjectResponse),
        (status = 400, description = "Invalid project ID"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "No read permission on this project"),
        (status = 404, description = "Project not found"),
        (status = 500, description = "Internal server error")
    )
)]
#[tracing::instrument(skip_all, fields(project_id = id))]
pub async fn get_project(
    State(state): State<AppState>,
    principal: Principal,
    Path(id): Path<ProjectId>,
) -> Result<Json<ProjectResponse>> {
    let id = parse_id(id)?;
    let controller = ProjectLifecycleController::new(&state);
    let view = controller.get(&principal, id).await?;
    Ok(Json(view.into()))
}

#[utoipa::path(
    put,
    path = "/projects/{id}",
    tag = "projects",
    summary = "Update a project",
    params(("id" = i64, Path, description = "Project ID")),
    request_body = ProjectUpdateRequest,
    responses(
        (status = 200, description = "Project updated"),
        (status = 400, description = "Invalid metadata"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "No update permission on this project"),
        (status = 404, description = "Project not found"),
        (status = 500, description = "Internal server error")
    )
)]
#[tracing::instrument(skip_all, fields(project_id = id))]
pub async fn update_project(
    State(state): State<AppState>,
    principal: Principal,
    Path(id): Path<ProjectId>,
    Json(request): Json<ProjectUpdateRequest>,
) -> Result<StatusCode> {
    let id = parse_id(id)?;
    let controller = ProjectLifecycleController::new(&state);
    controller
        .update(
            &principal,
            id,
            UpdateProject {
                metadata: request.metadata,
                cve_allowlist: request.cve_allowlist,
            },
        )
        .await?;
    Ok(StatusCode::OK)
}

#[utoipa::path(
    delete,
    path = "/projects/{id}",
    tag = "projects",
    summary = "Delete a project",
    params(("id" = i64, Path, description = "Project ID")),
    responses(
        (status = 200, description = "Project deleted"),
        (status = 400, description = "Invalid project ID"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "No delete permission on this project"),
        (status = 404, description = "Project not found"),
        (status = 412, description = "Project still contains subordinate resources"),
        (status = 500, description = "Internal server error")
    )
)]
#[tracing::instrument(skip_all, fields(project_id = id))]
pub async fn delete_project(
    State(state): State<AppState>,
    principal: Principal,
    Path(id): Path<ProjectId>,
) -> Result<StatusCode> {
    let id = parse_id(id)?;
    let controller = ProjectLifecycleController::new(&state);
    controller.delete(&principal, id).await?;
    Ok(StatusCode::OK)
}

#[utoipa::path(
    get,
    path = "/projects/{id}/_deletable",
    tag = "projects",
    summary = "Check whether a project could be deleted",
    params(("id" = i64, Path, description = "Project ID")),
    responses(
        (status = 200, description = "Deletability verdict", body = Deletability),
        (status = 400, description = "Invalid project ID"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "No delete permission on this project"),
        (status = 404, description = "Project not found"),
        (status = 500, description = "Internal server error")
    )
)]
#[tracing::instrument(skip_all, fields(project_id = id))]
pub async fn project_deletable(
    State(state): State<AppState>,
    principal: Principal,
    Path(id): Path<ProjectId>,
) -> Result<Json<Deletability>> {
    let id = parse_id(id)?;
    let controller = ProjectLifecycleController::new(&state);
    let deletability = controller.deletable(&principal, id).await?;
    Ok(Json(deletability))
}

#[utoipa::path(
    get,
    path = "/projects/{id}/summary",
    tag = "projects",
    summary = "Get a project's resource summary",
    params(("id" = i64, Path, description = "Project ID")),
    responses(
        (status = 200, description = "Project summary", body = ProjectSummary),
        (status = 400, description = "Invalid project ID"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "No read permission on this project"),
        (status = 404, description = "Project not found"),
        (status = 500, description = "Internal server error")
    )
)]
#[tracing::instrument(skip_all, fields(project_id = id))]
pub async fn project_summary(
    State(state): State<AppState>,
    principal: Principal,
    Path(id): Path<ProjectId>,
) -> Result<Json<ProjectSummary>> {
    let id = parse_id(id)?;
    let controller = ProjectLifecycleController::new(&state);
    let summary = controller.summary(&principal, id).await?;
    Ok(Json(summary))
}

#[utoipa::path(
    get,
    path = "/projects",
    tag = "projects",
    summary = "List projects",
    params(ListProjectsQuery),
    responses(
        (status = 200, description = "Page of projects, x-total-count holds the total", body = Vec<ProjectResponse>),
        (status = 401, description = "Anonymous access disabled"),
        (status = 500, description = "Internal server error")
    )
)]
#[tracing::instrument(skip_all)]
pub async fn list_projects(
    State(state): State<AppState>,
    principal: Principal,
    Query(query): Query<ListProjectsQuery>,
) -> Result<Response> {
    let controller = ProjectLifecycleController::new(&state);
    let pagination = query.pagination();
    let (views, total) = controller
        .list(
            &principal,
            ListProjects {
                name: query.name,
                owner: query.owner,
                public: query.public,
                page: pagination.page(),
                size: pagination.size(),
            },
        )
        .await?;

    let body: Vec<ProjectResponse> = views.into_iter().map(ProjectResponse::from).collect();
    let mut headers = HeaderMap::new();
    if let Ok(count) = total.to_string().parse() {
        headers.insert("x-total-count", count);
    }
    Ok((headers, Json(body)).into_response())
}
