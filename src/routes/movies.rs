use axum::{
    extract::State,
    routing::get,
    Json, Router,
};
use serde::Deserialize;
use utoipa::IntoParams;
use uuid::Uuid;

use crate::catalog::{self, CatalogQuery};
use crate::error::{ApiError, ApiResponse, AppError};
use crate::extract::{ApiJson, ApiPath, ApiQuery};
use crate::filter::Page;
use crate::importer::NormalizedRecord;
use crate::middleware::auth::AuthUser;
use crate::models::movie::{Movie, MovieInput};
use crate::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_movies).post(create_movie))
        .route("/search", get(search_movies))
        .route("/catalog", get(catalog_page))
        .route("/import/{imdb_id}", get(import_movie))
        .route(
            "/{id}",
            get(get_movie).put(update_movie).delete(delete_movie),
        )
}

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct SearchQuery {
    #[serde(default)]
    pub keyword: String,
}

#[derive(Debug, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct ImportQuery {
    /// Full plot instead of the short one.
    #[serde(default)]
    pub long_plot: bool,
}

#[utoipa::path(
    get,
    path = "/api/movies",
    responses(
        (status = 200, description = "Caller's movies, newest first", body = [Movie]),
        (status = 401, description = "Not signed in", body = ApiError),
    ),
    security(("bearer" = [])),
    tag = "Movies"
)]
pub(crate) async fn list_movies(
    State(state): State<AppState>,
    auth: AuthUser,
) -> Result<Json<ApiResponse<Vec<Movie>>>, AppError> {
    let movies = catalog::list(state.store.as_ref(), auth.user_id).await?;
    Ok(ApiResponse::ok("Movies", movies))
}

#[utoipa::path(
    get,
    path = "/api/movies/search",
    params(SearchQuery),
    responses(
        (status = 200, description = "Movies whose title, synopsis or description match", body = [Movie]),
        (status = 401, description = "Not signed in", body = ApiError),
    ),
    security(("bearer" = [])),
    tag = "Movies"
)]
pub(crate) async fn search_movies(
    State(state): State<AppState>,
    auth: AuthUser,
    ApiQuery(query): ApiQuery<SearchQuery>,
) -> Result<Json<ApiResponse<Vec<Movie>>>, AppError> {
    let movies = catalog::search(state.store.as_ref(), auth.user_id, &query.keyword).await?;
    Ok(ApiResponse::ok("Search results", movies))
}

#[utoipa::path(
    get,
    path = "/api/movies/catalog",
    params(CatalogQuery),
    responses(
        (status = 200, description = "One page of the searched and filtered catalog"),
        (status = 401, description = "Not signed in", body = ApiError),
        (status = 422, description = "Invalid filters or page size", body = ApiError),
    ),
    security(("bearer" = [])),
    tag = "Movies"
)]
pub(crate) async fn catalog_page(
    State(state): State<AppState>,
    auth: AuthUser,
    ApiQuery(query): ApiQuery<CatalogQuery>,
) -> Result<Json<ApiResponse<Page<Movie>>>, AppError> {
    let page = catalog::catalog_page(state.store.as_ref(), auth.user_id, &query).await?;
    Ok(ApiResponse::ok("Catalog page", page))
}

#[utoipa::path(
    get,
    path = "/api/movies/{id}",
    params(("id" = Uuid, Path, description = "Movie id")),
    responses(
        (status = 200, description = "The movie", body = Movie),
        (status = 404, description = "No such movie for this user", body = ApiError),
    ),
    security(("bearer" = [])),
    tag = "Movies"
)]
pub(crate) async fn get_movie(
    State(state): State<AppState>,
    auth: AuthUser,
    ApiPath(id): ApiPath<Uuid>,
) -> Result<Json<ApiResponse<Movie>>, AppError> {
    let movie = catalog::get(state.store.as_ref(), auth.user_id, id).await?;
    Ok(ApiResponse::ok("Movie", movie))
}

#[utoipa::path(
    post,
    path = "/api/movies",
    request_body = MovieInput,
    responses(
        (status = 200, description = "Movie created", body = Movie),
        (status = 409, description = "IMDb id already catalogued", body = ApiError),
        (status = 422, description = "Invalid input", body = ApiError),
    ),
    security(("bearer" = [])),
    tag = "Movies"
)]
pub(crate) async fn create_movie(
    State(state): State<AppState>,
    auth: AuthUser,
    ApiJson(input): ApiJson<MovieInput>,
) -> Result<Json<ApiResponse<Movie>>, AppError> {
    let movie = catalog::create(state.store.as_ref(), auth.user_id, input, state.today()).await?;
    Ok(ApiResponse::ok("Movie created", movie))
}

#[utoipa::path(
    put,
    path = "/api/movies/{id}",
    params(("id" = Uuid, Path, description = "Movie id")),
    request_body = MovieInput,
    responses(
        (status = 200, description = "Movie updated", body = Movie),
        (status = 404, description = "No such movie for this user", body = ApiError),
        (status = 422, description = "Invalid input", body = ApiError),
    ),
    security(("bearer" = [])),
    tag = "Movies"
)]
pub(crate) async fn update_movie(
    State(state): State<AppState>,
    auth: AuthUser,
    ApiPath(id): ApiPath<Uuid>,
    ApiJson(input): ApiJson<MovieInput>,
) -> Result<Json<ApiResponse<Movie>>, AppError> {
    let movie =
        catalog::update(state.store.as_ref(), auth.user_id, id, input, state.today()).await?;
    Ok(ApiResponse::ok("Movie updated", movie))
}

#[utoipa::path(
    delete,
    path = "/api/movies/{id}",
    params(("id" = Uuid, Path, description = "Movie id")),
    responses(
        (status = 200, description = "Movie deleted"),
        (status = 404, description = "No such movie for this user", body = ApiError),
    ),
    security(("bearer" = [])),
    tag = "Movies"
)]
pub(crate) async fn delete_movie(
    State(state): State<AppState>,
    auth: AuthUser,
    ApiPath(id): ApiPath<Uuid>,
) -> Result<Json<ApiResponse<()>>, AppError> {
    catalog::delete(state.store.as_ref(), auth.user_id, id).await?;
    Ok(ApiResponse::done("Movie deleted"))
}

#[utoipa::path(
    get,
    path = "/api/movies/import/{imdb_id}",
    params(
        ("imdb_id" = String, Path, description = "IMDb id, e.g. tt1375666"),
        ImportQuery,
    ),
    responses(
        (status = 200, description = "Normalized metadata to prefill a movie", body = NormalizedRecord),
        (status = 404, description = "Unknown to the provider", body = ApiError),
        (status = 422, description = "Malformed IMDb id", body = ApiError),
        (status = 502, description = "Provider unreachable", body = ApiError),
        (status = 503, description = "Import not configured", body = ApiError),
    ),
    security(("bearer" = [])),
    tag = "Movies"
)]
pub(crate) async fn import_movie(
    State(state): State<AppState>,
    _auth: AuthUser,
    ApiPath(imdb_id): ApiPath<String>,
    ApiQuery(query): ApiQuery<ImportQuery>,
) -> Result<Json<ApiResponse<NormalizedRecord>>, AppError> {
    let record = state
        .omdb
        .fetch_by_external_id(imdb_id.trim(), query.long_plot, state.today())
        .await?;
    Ok(ApiResponse::ok("Movie metadata", record))
}
