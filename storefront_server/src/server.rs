use actix_web::{dev::Server, middleware::Logger, web, App, HttpServer};
use open_payments::{OpenPaymentsClient, SigningConfig};

use crate::{
    checkout,
    config::ServerConfig,
    errors::ServerError,
    referral,
    routes,
    store::{ProductCatalog, ReferralSales, ReferralTransactions},
};

/// Shared state handed to every handler: the outbound client, the server's signing identity, and the stores.
pub struct AppState {
    pub client: OpenPaymentsClient,
    pub signing: SigningConfig,
    pub catalog: ProductCatalog,
    pub sales: ReferralSales,
    pub transactions: ReferralTransactions,
}

impl AppState {
    pub fn from_config(config: &ServerConfig) -> Self {
        Self {
            client: OpenPaymentsClient::new(),
            signing: config.signing.clone(),
            catalog: ProductCatalog::new(&config.store.products_file, &config.signing.wallet_address_url),
            sales: ReferralSales::new(&config.store.referral_sales_file),
            transactions: ReferralTransactions::new(&config.store.referral_tx_file),
        }
    }
}

pub async fn run_server(config: ServerConfig) -> Result<(), ServerError> {
    let srv = create_server_instance(config)?;
    srv.await.map_err(|e| ServerError::InitializeError(e.to_string()))
}

pub fn create_server_instance(config: ServerConfig) -> Result<Server, ServerError> {
    let host = config.host.clone();
    let port = config.port;
    // One state for all workers: the client's key cache and the store mutexes must be process-wide.
    let state = web::Data::new(AppState::from_config(&config));
    let srv = HttpServer::new(move || {
        App::new()
            .wrap(Logger::new("%t (%D ms) %s %a %{Host}i %U").log_target("ops::access_log"))
            .app_data(state.clone())
            .service(routes::health)
            .service(routes::info)
            .service(routes::search_products)
            .service(routes::add_product)
            .service(routes::get_product)
            .service(routes::wallet_info)
            .service(routes::wallet_keys)
            .service(routes::wallet_validate)
            .service(routes::incoming_payment_grant)
            .service(routes::quote_grant)
            .service(routes::outgoing_payment_grant)
            .service(routes::continue_grant)
            .service(routes::revoke_grant)
            .service(routes::create_incoming_payment)
            .service(routes::get_incoming_payment)
            .service(routes::list_incoming_payments)
            .service(routes::complete_incoming_payment)
            .service(routes::create_quote)
            .service(routes::get_quote)
            .service(routes::quote_fixed_send)
            .service(routes::quote_fixed_receive)
            .service(routes::create_outgoing_payment)
            .service(routes::get_outgoing_payment)
            .service(routes::list_outgoing_payments)
            .service(routes::rotate_token)
            .service(routes::revoke_token)
            .service(routes::payment_link)
            .service(routes::referral_webhook)
            .service(referral::referral_link)
            .service(checkout::initiate_payment)
    })
    .bind((host.as_str(), port))?
    .run();
    Ok(srv)
}
