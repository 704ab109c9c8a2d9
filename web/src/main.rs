use crate::app_context::{AppContext, DRIVE_SCOPE};
use actix_web::cookie::time::Duration;
use actix_web::cookie::Cookie;
use actix_web::http::header;
use actix_web::{get, middleware, web, App, HttpRequest, HttpResponse, HttpServer, Responder};
use config::config::AppConfig;
use config::resolve_file_path::resolve_config_file_path;
use drive_warden_client::facade::{DriveFacade, DEFAULT_LIST_FIELDS};
use drive_warden_client::google_drive_hub_adapter_builder::GoogleDriveHubAdapterBuilder;
use drive_warden_client::token::{
    StoredToken, TokenState, TOKEN_COOKIE, TOKEN_COOKIE_MAX_AGE_SECS,
};
use log::{debug, error};
use serde::Deserialize;
use serde_json::json;
use std::env;
use std::error::Error;

mod app_context;
mod config;

#[derive(Deserialize)]
struct ListQuery {
    fields: Option<String>,
}

#[derive(Deserialize)]
struct CreateFolderRequest {
    name: String,
    #[serde(rename = "parentId")]
    parent_id: Option<String>,
}

#[derive(Deserialize)]
struct CreateFileRequest {
    name: String,
    #[serde(rename = "mimeType")]
    mime_type: String,
    #[serde(rename = "parentId")]
    parent_id: Option<String>,
}

#[derive(Deserialize)]
struct UploadFileRequest {
    name: String,
    #[serde(rename = "mimeType")]
    mime_type: String,
    #[serde(rename = "sourcePath")]
    source_path: String,
    #[serde(rename = "parentId")]
    parent_id: Option<String>,
}

#[derive(Deserialize)]
struct MoveFileRequest {
    #[serde(rename = "folderId")]
    folder_id: String,
}

#[derive(Deserialize)]
struct TransferOwnershipRequest {
    ids: Vec<String>,
}

#[derive(Deserialize)]
struct CallbackQuery {
    code: Option<String>,
}

fn token_cookie(token: &StoredToken) -> Result<Cookie<'static>, String> {
    Ok(Cookie::build(TOKEN_COOKIE, token.to_cookie_value()?)
        .path("/")
        .max_age(Duration::seconds(TOKEN_COOKIE_MAX_AGE_SECS))
        .finish())
}

fn removal_cookie() -> Cookie<'static> {
    let mut cookie = Cookie::build(TOKEN_COOKIE, "").path("/").finish();
    cookie.make_removal();
    cookie
}

fn internal_error(message: String) -> HttpResponse {
    HttpResponse::InternalServerError().json(json!({ "error": message }))
}

fn consent_redirect(context: &AppContext) -> HttpResponse {
    match context.token_manager.auth_url() {
        Ok(url) => HttpResponse::Found()
            .insert_header((header::LOCATION, url))
            .finish(),
        Err(e) => internal_error(format!("Failed to build consent URL: {}", e)),
    }
}

fn with_cookie(mut response: HttpResponse, cookie: Option<Cookie<'static>>) -> HttpResponse {
    if let Some(cookie) = cookie {
        let _ = response.add_cookie(&cookie);
    }
    response
}

fn read_token_cookie(req: &HttpRequest) -> Option<StoredToken> {
    let cookie = req.cookie(TOKEN_COOKIE)?;
    match StoredToken::from_cookie_value(cookie.value()) {
        Ok(token) => Some(token),
        Err(e) => {
            debug!("Ignoring unreadable token cookie: {}", e);
            None
        }
    }
}

async fn build_facade(context: &AppContext, token: &StoredToken) -> Result<DriveFacade, String> {
    let hub = GoogleDriveHubAdapterBuilder::new()
        .with_scope(DRIVE_SCOPE.to_string())
        .with_access_token(token.access_token.clone())
        .build()?;
    DriveFacade::new(
        hub,
        context.owner_email.clone(),
        context.verified_emails.clone(),
    )
    .await
}

/// Runs the token lifecycle for one request: a valid cookie token is used as
/// is, an expired one with a refresh token is refreshed silently (the fresh
/// cookie rides along on the response), anything else bounces the caller to
/// the consent screen.
async fn authorize(
    req: &HttpRequest,
    context: &AppContext,
) -> Result<(DriveFacade, Option<Cookie<'static>>), HttpResponse> {
    let stored = read_token_cookie(req);
    let (token, refreshed_cookie) = match (TokenState::current(stored.as_ref()), stored) {
        (TokenState::Valid, Some(token)) => (token, None),
        (TokenState::ExpiredWithRefresh, Some(token)) => {
            match context.token_manager.refresh(&token).await {
                Ok(fresh) => {
                    let cookie = token_cookie(&fresh).map_err(internal_error)?;
                    (fresh, Some(cookie))
                }
                Err(e) => {
                    error!("Token refresh failed: {}", e);
                    return Err(consent_redirect(context));
                }
            }
        }
        _ => return Err(consent_redirect(context)),
    };
    let facade = build_facade(context, &token).await.map_err(internal_error)?;
    Ok((facade, refreshed_cookie))
}

#[get("/")]
async fn hello() -> impl Responder {
    HttpResponse::Ok().body("drive-warden backend")
}

async fn whoami(req: HttpRequest, context: web::Data<AppContext>) -> HttpResponse {
    let (facade, cookie) = match authorize(&req, &context).await {
        Ok(authorized) => authorized,
        Err(response) => return response,
    };
    with_cookie(
        HttpResponse::Ok().json(json!({ "email": facade.email() })),
        cookie,
    )
}

async fn list_files(
    req: HttpRequest,
    query: web::Query<ListQuery>,
    context: web::Data<AppContext>,
) -> HttpResponse {
    let (facade, cookie) = match authorize(&req, &context).await {
        Ok(authorized) => authorized,
        Err(response) => return response,
    };
    let fields = query.fields.as_deref().unwrap_or(DEFAULT_LIST_FIELDS);
    let files = facade.list_files(fields).await;
    with_cookie(HttpResponse::Ok().json(files), cookie)
}

async fn create_folder(
    req: HttpRequest,
    body: web::Json<CreateFolderRequest>,
    context: web::Data<AppContext>,
) -> HttpResponse {
    let (facade, cookie) = match authorize(&req, &context).await {
        Ok(authorized) => authorized,
        Err(response) => return response,
    };
    match facade
        .create_folder(&body.name, body.parent_id.as_deref())
        .await
    {
        Ok(id) => with_cookie(HttpResponse::Created().json(json!({ "id": id })), cookie),
        Err(e) => internal_error(format!("Failed to create folder: {}", e)),
    }
}

async fn create_file(
    req: HttpRequest,
    body: web::Json<CreateFileRequest>,
    context: web::Data<AppContext>,
) -> HttpResponse {
    let (facade, cookie) = match authorize(&req, &context).await {
        Ok(authorized) => authorized,
        Err(response) => return response,
    };
    match facade
        .create_file(&body.name, &body.mime_type, body.parent_id.as_deref())
        .await
    {
        Ok(id) => with_cookie(HttpResponse::Created().json(json!({ "id": id })), cookie),
        Err(e) => internal_error(format!("Failed to create file: {}", e)),
    }
}

async fn upload_file(
    req: HttpRequest,
    body: web::Json<UploadFileRequest>,
    context: web::Data<AppContext>,
) -> HttpResponse {
    let (facade, cookie) = match authorize(&req, &context).await {
        Ok(authorized) => authorized,
        Err(response) => return response,
    };
    match facade
        .upload_file(
            &body.name,
            &body.mime_type,
            &body.source_path,
            body.parent_id.as_deref(),
        )
        .await
    {
        Ok(id) => with_cookie(HttpResponse::Created().json(json!({ "id": id })), cookie),
        Err(e) => internal_error(format!("Failed to upload file: {}", e)),
    }
}

async fn move_file(
    req: HttpRequest,
    path: web::Path<String>,
    body: web::Json<MoveFileRequest>,
    context: web::Data<AppContext>,
) -> HttpResponse {
    let (facade, cookie) = match authorize(&req, &context).await {
        Ok(authorized) => authorized,
        Err(response) => return response,
    };
    match facade.move_file(&path, &body.folder_id).await {
        Ok(()) => with_cookie(HttpResponse::NoContent().finish(), cookie),
        Err(e) => internal_error(format!("Failed to move file: {}", e)),
    }
}

async fn download_file(
    req: HttpRequest,
    path: web::Path<String>,
    context: web::Data<AppContext>,
) -> HttpResponse {
    let (facade, cookie) = match authorize(&req, &context).await {
        Ok(authorized) => authorized,
        Err(response) => return response,
    };
    match facade.download_file(&path).await {
        Ok(content) => with_cookie(
            HttpResponse::Ok()
                .content_type("application/octet-stream")
                .body(content),
            cookie,
        ),
        Err(e) => HttpResponse::NotFound().json(json!({
            "error": format!("Failed to download file: {}", e)
        })),
    }
}

async fn ownership_violations(req: HttpRequest, context: web::Data<AppContext>) -> HttpResponse {
    let (facade, cookie) = match authorize(&req, &context).await {
        Ok(authorized) => authorized,
        Err(response) => return response,
    };
    let files_in_danger = facade.files_in_danger().await;
    with_cookie(HttpResponse::Ok().json(files_in_danger), cookie)
}

async fn ownership_transfer(
    req: HttpRequest,
    body: web::Json<TransferOwnershipRequest>,
    context: web::Data<AppContext>,
) -> HttpResponse {
    let (facade, cookie) = match authorize(&req, &context).await {
        Ok(authorized) => authorized,
        Err(response) => return response,
    };
    match facade.set_verified_owner(&body.ids).await {
        Ok(granted) => with_cookie(
            HttpResponse::Ok().json(json!({ "transferred": granted.len() })),
            cookie,
        ),
        Err(e) => internal_error(format!("Failed to transfer ownership: {}", e)),
    }
}

/// Redirect URI target. Exchanges the consent code for a token, persists it
/// in the cookie and sends the browser back to the registered redirect URI.
async fn oauth_callback(
    query: web::Query<CallbackQuery>,
    context: web::Data<AppContext>,
) -> HttpResponse {
    let code = match query.code.as_deref() {
        Some(code) => code,
        None => return consent_redirect(&context),
    };
    match context.token_manager.exchange_code(code).await {
        Ok(token) => match token_cookie(&token) {
            Ok(cookie) => {
                let response = HttpResponse::Found()
                    .insert_header((
                        header::LOCATION,
                        format!("{}?login", context.redirect_uri),
                    ))
                    .finish();
                with_cookie(response, Some(cookie))
            }
            Err(e) => internal_error(e),
        },
        Err(e) => {
            error!("Authorization code exchange failed: {}", e);
            HttpResponse::Unauthorized().json(json!({
                "error": format!("Authorization code exchange failed: {}", e)
            }))
        }
    }
}

async fn logout() -> HttpResponse {
    with_cookie(HttpResponse::NoContent().finish(), Some(removal_cookie()))
}

fn get_app_config() -> Result<AppConfig, Box<dyn Error>> {
    let args: Vec<String> = env::args().collect();
    let config_path = resolve_config_file_path(&args, &["config.json"])?;
    debug!("Using configuration file: {:?}", config_path);

    let config: AppConfig = serde_json::from_reader(std::fs::File::open(config_path)?)?;
    debug!("Loaded config: {:#?}", config);
    Ok(config)
}

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    env_logger::init_from_env(env_logger::Env::new().default_filter_or("info"));

    let config = get_app_config().expect("Failed to load configuration");
    let context = AppContext::from_config(&config).expect("Failed to initialize app context");
    let bind_address = config
        .bind_address
        .unwrap_or_else(|| "0.0.0.0:8080".to_string());
    let data = web::Data::new(context);

    HttpServer::new(move || {
        App::new()
            .wrap(middleware::Compress::default())
            .app_data(data.clone())
            .service(hello)
            .route("/whoami", web::get().to(whoami))
            .route("/files", web::get().to(list_files))
            .route("/files", web::post().to(create_file))
            .route("/files/upload", web::post().to(upload_file))
            .route("/files/{id}/move", web::post().to(move_file))
            .route("/files/{id}/download", web::get().to(download_file))
            .route("/folders", web::post().to(create_folder))
            .route("/ownership/violations", web::get().to(ownership_violations))
            .route("/ownership/transfer", web::post().to(ownership_transfer))
            .route("/oauth/callback", web::get().to(oauth_callback))
            .route("/logout", web::get().to(logout))
    })
    .bind(bind_address)?
    .run()
    .await
}
