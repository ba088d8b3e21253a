use axum::{Json, extract::State, http::StatusCode};
use chrono::Utc;
use uuid::Uuid;

use crate::{
    AppState,
    auth::{Admins, AuthUser, Authorized, Clients, CommandParties},
    errors::ApiError,
    extract::{ObjectId, ValidatedJson},
    models::{
        Command, CommandScope, CommandStatus, CreateCommandRequest, NewCommand,
        UpdateCommandStatusRequest,
    },
};

/// The commands a caller may see: everything for admins, assigned ones for providers,
/// their own for clients.
fn scope_for(user: &AuthUser) -> CommandScope {
    if user.is_admin() {
        CommandScope::All
    } else if user.is_provider() {
        CommandScope::Provider(user.id)
    } else {
        CommandScope::Client(user.id)
    }
}

/// Whether `user` may move `command` to `next`. Only the assigned provider (or an admin)
/// can complete; the client may also cancel.
fn may_transition(user: &AuthUser, command: &Command, next: CommandStatus) -> bool {
    if user.is_admin() {
        return true;
    }
    let provider = user.is_provider() && command.is_assigned_to(user.id);
    match next {
        CommandStatus::Completed => provider,
        CommandStatus::Canceled => provider || command.is_visible_to_client(user.id),
        CommandStatus::Pending => false,
    }
}

/// Fetches a command the caller is allowed to see. Invisible commands are reported as
/// missing.
async fn find_visible(state: &AppState, user: &AuthUser, id: Uuid) -> Result<Command, ApiError> {
    state
        .repo
        .get_command(id)
        .await?
        .filter(|command| scope_for(user).includes(command))
        .ok_or_else(|| ApiError::not_found("command"))
}

/// create_command
///
/// [Client Route] Places a command with a validated provider. An optional promo code must
/// be active and unexpired; its discount is fixed into the command's `total`.
#[utoipa::path(
    post,
    path = "/api/commands",
    request_body = CreateCommandRequest,
    responses(
        (status = 201, description = "Created", body = Command),
        (status = 400, description = "Provider not validated or unusable promo code"),
        (status = 404, description = "Provider or service type not found")
    )
)]
pub async fn create_command(
    Authorized { user, .. }: Authorized<Clients>,
    State(state): State<AppState>,
    ValidatedJson(payload): ValidatedJson<CreateCommandRequest>,
) -> Result<(StatusCode, Json<Command>), ApiError> {
    let provider = state
        .repo
        .get_service_provider(payload.service_provider_id)
        .await?
        .ok_or_else(|| ApiError::not_found("service provider"))?;
    if !provider.is_validated() {
        return Err(ApiError::Validation(
            "This service provider cannot take commands.".to_string(),
        ));
    }

    if let Some(type_id) = payload.service_type_id {
        state
            .repo
            .get_service_type(type_id)
            .await?
            .ok_or_else(|| ApiError::not_found("service type"))?;
    }

    let promo = match payload.promo_code.as_deref() {
        Some(code) => {
            let promo = state
                .repo
                .find_promo_code(code)
                .await?
                .filter(|promo| promo.is_usable(Utc::now()))
                .ok_or_else(|| ApiError::Validation("Invalid or expired promo code.".to_string()))?;
            Some((promo.code, promo.discount))
        }
        None => None,
    };

    let command = state
        .repo
        .create_command(NewCommand::new(user.id, payload, promo))
        .await?;
    tracing::info!(
        command_id = %command.id,
        service_provider_id = %command.service_provider_id,
        "command created"
    );
    Ok((StatusCode::CREATED, Json(command)))
}

/// get_commands
///
/// [Authenticated Route] Lists the commands visible to the caller, newest first.
#[utoipa::path(
    get,
    path = "/api/commands",
    responses((status = 200, description = "Commands", body = [Command]))
)]
pub async fn get_commands(
    Authorized { user, .. }: Authorized<CommandParties>,
    State(state): State<AppState>,
) -> Result<Json<Vec<Command>>, ApiError> {
    Ok(Json(state.repo.list_commands(scope_for(&user)).await?))
}

#[utoipa::path(
    get,
    path = "/api/commands/{id}",
    params(("id" = Uuid, Path, description = "Command ID")),
    responses(
        (status = 200, description = "Found", body = Command),
        (status = 404, description = "Not Found")
    )
)]
pub async fn get_command(
    Authorized { user, .. }: Authorized<CommandParties>,
    ObjectId(id): ObjectId,
    State(state): State<AppState>,
) -> Result<Json<Command>, ApiError> {
    Ok(Json(find_visible(&state, &user, id).await?))
}

/// update_command_status
///
/// [Authenticated Route] Cancels or completes a pending command. Completing credits the
/// provider and records an intervention; any move out of a terminal status is `409`.
#[utoipa::path(
    put,
    path = "/api/commands/{id}/status",
    params(("id" = Uuid, Path, description = "Command ID")),
    request_body = UpdateCommandStatusRequest,
    responses(
        (status = 200, description = "Updated", body = Command),
        (status = 403, description = "Caller may not make this change"),
        (status = 404, description = "Not Found"),
        (status = 409, description = "Illegal transition")
    )
)]
pub async fn update_command_status(
    Authorized { user, .. }: Authorized<CommandParties>,
    ObjectId(id): ObjectId,
    State(state): State<AppState>,
    ValidatedJson(payload): ValidatedJson<UpdateCommandStatusRequest>,
) -> Result<Json<Command>, ApiError> {
    let command = find_visible(&state, &user, id).await?;
    if !may_transition(&user, &command, payload.status) {
        return Err(ApiError::Forbidden);
    }

    state
        .repo
        .update_command_status(id, payload.status)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::not_found("command"))
}

#[utoipa::path(
    delete,
    path = "/api/commands/{id}",
    params(("id" = Uuid, Path, description = "Command ID")),
    responses(
        (status = 204, description = "Deleted"),
        (status = 404, description = "Not Found")
    )
)]
pub async fn delete_command(
    _admin: Authorized<Admins>,
    ObjectId(id): ObjectId,
    State(state): State<AppState>,
) -> Result<StatusCode, ApiError> {
    state
        .repo
        .delete_command(id)
        .await?
        .ok_or_else(|| ApiError::not_found("command"))?;
    Ok(StatusCode::NO_CONTENT)
}
