//! The straight-through checkout flow.
//!
//! Drives one payment from sender to receiver end to end: incoming payment on the receiver's side, a quote for
//! the sender, then an outgoing-payment grant with a redirect interaction. The grant normally comes back
//! pending, so the response carries the redirect URL and the continuation data; the caller finishes with
//! `POST /api/grants/continue` and `POST /api/outgoing-payments` once the owner has consented.

use actix_web::{post, web, HttpResponse};
use log::*;
use op_common::{Amount, MinorUnits};
use open_payments::{Grant, NewIncomingPayment, NewOutgoingPayment, NewQuote};
use serde_json::json;

use crate::{data_objects::CheckoutParams, errors::ServerError, server::AppState};

#[post("/api/payment")]
pub async fn initiate_payment(
    state: web::Data<AppState>,
    params: web::Json<CheckoutParams>,
) -> Result<HttpResponse, ServerError> {
    let params = params.into_inner();
    let amount = params
        .amount
        .parse::<MinorUnits>()
        .map_err(|e| ServerError::InvalidRequest(e.to_string()))?;
    if !amount.is_positive() {
        return Err(ServerError::InvalidRequest("amount must be a positive integer string".into()));
    }

    let client = &state.client;
    let signing = &state.signing;

    let (sender, receiver) = futures::try_join!(
        client.get_wallet_address(&params.sender_wallet_address),
        client.get_wallet_address(&params.receiver_wallet_address),
    )?;
    debug!("Checkout: {} -> {}", sender.id, receiver.id);

    // Receiver side: grant, then the incoming payment the money lands on.
    let incoming_grant =
        client.request_incoming_payment_grant(&receiver.auth_server, signing).await?.into_finalized()?;
    let incoming_amount = Amount::new(amount, &receiver.asset_code, receiver.asset_scale);
    let incoming_payment = client
        .create_incoming_payment(
            &receiver.resource_server,
            &incoming_grant.access_token.value,
            &NewIncomingPayment::new(&receiver.id, incoming_amount),
            signing,
        )
        .await?;

    // Sender side: a quote priced against the incoming payment. The quote resource lives on the receiver's
    // resource server, keyed to the sender's wallet.
    let quote_grant = client.request_quote_grant(&sender.auth_server, signing).await?.into_finalized()?;
    let quote = client
        .create_quote(
            &receiver.resource_server,
            &quote_grant.access_token.value,
            &NewQuote::new(&sender.id, &incoming_payment.id),
            signing,
        )
        .await?;

    // Spending from the sender's wallet needs the owner's consent.
    let outgoing_grant = client
        .request_outgoing_payment_grant(&sender.auth_server, &sender.id, quote.debit_amount.clone(), signing, true)
        .await?;

    match outgoing_grant {
        Grant::Pending(pending) => Ok(HttpResponse::Ok().json(json!({
            "status": "interaction-required",
            "incomingPayment": incoming_payment,
            "quote": quote,
            "redirect": pending.interact.as_ref().map(|i| i.redirect.clone()),
            "continue": {
                "uri": pending.continuation.uri,
                "accessToken": pending.continuation.access_token.value,
            },
        }))),
        // Some test wallets finalize without interaction; complete the payment on the spot.
        Grant::Finalized(finalized) => {
            let payment = client
                .create_outgoing_payment(
                    &sender.resource_server,
                    &finalized.access_token.value,
                    &NewOutgoingPayment::new(&sender.id, &quote.id),
                    signing,
                )
                .await?;
            info!("Checkout completed without interaction: {}", payment.id);
            Ok(HttpResponse::Ok().json(json!({
                "status": "completed",
                "incomingPayment": incoming_payment,
                "quote": quote,
                "outgoingPayment": payment,
            })))
        },
    }
}
