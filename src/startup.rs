use actix_web::dev::Server;
use actix_web::{web, App, HttpServer};
use std::net::TcpListener;

use crate::auth::service::AuthService;
use crate::middleware::{JwtMiddleware, RequestLogger};
use crate::routes::{
    delete_user, get_current_user, health_check, login, logout, refresh, register,
};

pub fn run(listener: TcpListener, auth: AuthService) -> Result<Server, std::io::Error> {
    let auth = web::Data::new(auth);

    let server = HttpServer::new(move || {
        App::new()
            .wrap(RequestLogger)
            .app_data(auth.clone())
            // Public routes
            .route("/health_check", web::get().to(health_check))
            .route("/auth/register", web::post().to(register))
            .route("/auth/login", web::post().to(login))
            .route("/auth/refresh", web::post().to(refresh))
            // Protected routes, gated by the authorization guard
            .service(
                web::scope("/auth")
                    .wrap(JwtMiddleware::new(auth.clone()))
                    .route("/logout", web::delete().to(logout))
                    .route("/me", web::get().to(get_current_user)),
            )
            .service(
                web::scope("/users")
                    .wrap(JwtMiddleware::new(auth.clone()))
                    .route("/{id}", web::delete().to(delete_user)),
            )
    })
    .listen(listener)?
    .run();

    Ok(server)
}
