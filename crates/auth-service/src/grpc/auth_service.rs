//! gRPC handlers for `auth.AuthService`.
//!
//! # Security
//!
//! - Restricted operations are gated before they reach these handlers;
//!   handlers read the caller through [`caller`], which fails closed
//! - Passwords and credentials are never logged

use crate::grpc::request_gate::caller;
use crate::models::{Role, User, UserFilter, UserUpdate};
use crate::services::login_service::LoginService;
use crate::services::session_rotator::SessionRotator;
use crate::services::unix_now;
use crate::services::user_service::{NewAccount, UserService};
use auth_proto::auth_service_server::AuthService;
use auth_proto::{
    BaseResponse, ChangePasswordRequest, CreateUserRequest, DeleteUserRequest, Empty,
    GetAllUserRequest, GetAllUserResponse, GetUserByIdRequest, LoginRequest, LoginResponse,
    LogoutRequest, ProfileRecord, RefreshTokenRequest, RefreshTokenResponse, UpdateUserRequest,
    UserRecord, VerifyResponse,
};
use common::secret::SecretString;
use tonic::{Request, Response, Status};
use tracing::instrument;

impl From<&User> for UserRecord {
    fn from(user: &User) -> Self {
        UserRecord {
            id: user.id.to_string(),
            name: user.name.clone(),
            email: user.email.clone(),
            role: user.role.to_wire(),
            is_active: user.is_active,
            note: user.note.clone(),
            created_at: user.created_at.timestamp(),
            updated_at: user.updated_at.timestamp(),
            deleted_at: user.deleted_at.map_or(0, |t| t.timestamp()),
        }
    }
}

impl From<&User> for ProfileRecord {
    fn from(user: &User) -> Self {
        ProfileRecord {
            id: user.id.to_string(),
            name: user.name.clone(),
            email: user.email.clone(),
            created_at: user.created_at.timestamp(),
            updated_at: user.updated_at.timestamp(),
            deleted_at: user.deleted_at.map_or(0, |t| t.timestamp()),
        }
    }
}

fn message(text: &str) -> Response<BaseResponse> {
    Response::new(BaseResponse {
        message: text.to_string(),
    })
}

/// Handler set for `auth.AuthService`.
#[derive(Clone)]
pub struct AuthGrpcService {
    login: LoginService,
    rotator: SessionRotator,
    users: UserService,
}

impl AuthGrpcService {
    pub fn new(login: LoginService, rotator: SessionRotator, users: UserService) -> Self {
        Self {
            login,
            rotator,
            users,
        }
    }

    async fn login_as(
        &self,
        request: Request<LoginRequest>,
        role: Role,
    ) -> Result<Response<LoginResponse>, Status> {
        let req = request.into_inner();
        let pair = self
            .login
            .login(&req.email, &req.password, role, unix_now())
            .await?;

        Ok(Response::new(LoginResponse {
            access_token: pair.access_token,
            refresh_token: pair.refresh_token,
        }))
    }
}

#[tonic::async_trait]
impl AuthService for AuthGrpcService {
    #[instrument(skip_all, name = "auth.grpc.login_admin")]
    async fn login_admin(
        &self,
        request: Request<LoginRequest>,
    ) -> Result<Response<LoginResponse>, Status> {
        self.login_as(request, Role::Admin).await
    }

    #[instrument(skip_all, name = "auth.grpc.login_customer")]
    async fn login_customer(
        &self,
        request: Request<LoginRequest>,
    ) -> Result<Response<LoginResponse>, Status> {
        self.login_as(request, Role::Customer).await
    }

    #[instrument(skip_all, name = "auth.grpc.login_committee")]
    async fn login_committee(
        &self,
        request: Request<LoginRequest>,
    ) -> Result<Response<LoginResponse>, Status> {
        self.login_as(request, Role::Committee).await
    }

    #[instrument(skip_all, name = "auth.grpc.refresh_token")]
    async fn refresh_token(
        &self,
        request: Request<RefreshTokenRequest>,
    ) -> Result<Response<RefreshTokenResponse>, Status> {
        let req = request.into_inner();
        if req.refresh_token.is_empty() {
            return Err(Status::invalid_argument("refresh token is required"));
        }

        let pair = self
            .rotator
            .rotate(&req.access_token, &req.refresh_token, unix_now())
            .await?;

        Ok(Response::new(RefreshTokenResponse {
            access_token: pair.access_token,
            refresh_token: pair.refresh_token,
        }))
    }

    #[instrument(skip_all, name = "auth.grpc.verify")]
    async fn verify(&self, request: Request<Empty>) -> Result<Response<VerifyResponse>, Status> {
        let claims = &caller(&request)?.claims;

        Ok(Response::new(VerifyResponse {
            id: claims.sub.clone(),
            name: claims.name.clone().unwrap_or_default(),
            role: claims.role.map_or(0, Role::to_wire),
            expires_at: claims.exp,
        }))
    }

    #[instrument(skip_all, name = "auth.grpc.logout")]
    async fn logout(
        &self,
        request: Request<LogoutRequest>,
    ) -> Result<Response<BaseResponse>, Status> {
        let context = caller(&request)?.clone();
        let req = request.into_inner();

        self.login.logout(&context, &req.refresh_token).await?;

        Ok(message("logged out successfully"))
    }

    #[instrument(skip_all, name = "auth.grpc.create_user")]
    async fn create_user(
        &self,
        request: Request<CreateUserRequest>,
    ) -> Result<Response<BaseResponse>, Status> {
        let req = request.into_inner();
        let role =
            Role::from_wire(req.role).ok_or_else(|| Status::invalid_argument("invalid role"))?;

        self.users
            .create_user(NewAccount {
                name: req.name,
                email: req.email,
                password: SecretString::from(req.password),
                role,
                is_active: req.is_active,
                note: req.note,
            })
            .await?;

        Ok(message("user created successfully"))
    }

    #[instrument(skip_all, name = "auth.grpc.get_all_user")]
    async fn get_all_user(
        &self,
        request: Request<GetAllUserRequest>,
    ) -> Result<Response<GetAllUserResponse>, Status> {
        let req = request.into_inner();
        let search = req.search.trim();

        let users = self
            .users
            .list_users(UserFilter {
                search: (!search.is_empty()).then(|| search.to_string()),
                is_active: req.is_active,
            })
            .await?;

        Ok(Response::new(GetAllUserResponse {
            users: users.iter().map(UserRecord::from).collect(),
        }))
    }

    #[instrument(skip_all, name = "auth.grpc.get_user_by_id")]
    async fn get_user_by_id(
        &self,
        request: Request<GetUserByIdRequest>,
    ) -> Result<Response<UserRecord>, Status> {
        let user = self.users.get_user(&request.get_ref().id).await?;
        Ok(Response::new(UserRecord::from(&user)))
    }

    #[instrument(skip_all, name = "auth.grpc.update_user")]
    async fn update_user(
        &self,
        request: Request<UpdateUserRequest>,
    ) -> Result<Response<BaseResponse>, Status> {
        let req = request.into_inner();

        self.users
            .update_user(
                &req.id,
                UserUpdate {
                    name: req.name,
                    is_active: req.is_active,
                    note: req.note,
                },
            )
            .await?;

        Ok(message("user updated successfully"))
    }

    #[instrument(skip_all, name = "auth.grpc.delete_user")]
    async fn delete_user(
        &self,
        request: Request<DeleteUserRequest>,
    ) -> Result<Response<BaseResponse>, Status> {
        self.users.delete_user(&request.get_ref().id).await?;
        Ok(message("user deleted successfully"))
    }

    #[instrument(skip_all, name = "auth.grpc.get_profile_by_id")]
    async fn get_profile_by_id(
        &self,
        request: Request<Empty>,
    ) -> Result<Response<ProfileRecord>, Status> {
        let claims = &caller(&request)?.claims;
        let user = self.users.get_profile(claims).await?;
        Ok(Response::new(ProfileRecord::from(&user)))
    }

    #[instrument(skip_all, name = "auth.grpc.change_password")]
    async fn change_password(
        &self,
        request: Request<ChangePasswordRequest>,
    ) -> Result<Response<BaseResponse>, Status> {
        let claims = caller(&request)?.claims.clone();
        let req = request.into_inner();

        self.users
            .change_password(
                &claims,
                &SecretString::from(req.old_password),
                &SecretString::from(req.new_password),
            )
            .await?;

        Ok(message("password changed successfully"))
    }
}
