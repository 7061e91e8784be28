// Build script generating the AuthService gRPC server and client.
//
// Messages are plain prost derives in src/lib.rs, so the service is described
// with tonic-build's manual builder instead of a .proto file.

use tonic_build::manual::{Builder, Method, Service};

const PROST_CODEC: &str = "tonic::codec::ProstCodec";

/// (method name, route name, input type, output type)
const METHODS: &[(&str, &str, &str, &str)] = &[
    ("login_admin", "LoginAdmin", "LoginRequest", "LoginResponse"),
    ("login_customer", "LoginCustomer", "LoginRequest", "LoginResponse"),
    ("login_committee", "LoginCommittee", "LoginRequest", "LoginResponse"),
    ("refresh_token", "RefreshToken", "RefreshTokenRequest", "RefreshTokenResponse"),
    ("verify", "Verify", "Empty", "VerifyResponse"),
    ("logout", "Logout", "LogoutRequest", "BaseResponse"),
    ("create_user", "CreateUser", "CreateUserRequest", "BaseResponse"),
    ("get_all_user", "GetAllUser", "GetAllUserRequest", "GetAllUserResponse"),
    ("get_user_by_id", "GetUserByID", "GetUserByIdRequest", "UserRecord"),
    ("update_user", "UpdateUser", "UpdateUserRequest", "BaseResponse"),
    ("delete_user", "DeleteUser", "DeleteUserRequest", "BaseResponse"),
    ("get_profile_by_id", "GetProfileByID", "Empty", "ProfileRecord"),
    ("change_password", "ChangePassword", "ChangePasswordRequest", "BaseResponse"),
];

fn main() {
    let service = METHODS
        .iter()
        .fold(
            Service::builder().name("AuthService").package("auth"),
            |builder, (name, route, input, output)| {
                builder.method(
                    Method::builder()
                        .name(name)
                        .route_name(route)
                        .input_type(format!("crate::{input}"))
                        .output_type(format!("crate::{output}"))
                        .codec_path(PROST_CODEC)
                        .build(),
                )
            },
        )
        .build();

    Builder::new().compile(&[service]);

    println!("cargo:rerun-if-changed=build.rs");
}
