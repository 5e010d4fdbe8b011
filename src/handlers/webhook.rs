use axum::{
    extract::{Query, State},
    response::Redirect,
};
use serde::Deserialize;

use crate::error::AppError;
use crate::services::CallbackParams;
use crate::validation::{non_empty_param, validate_max_len, TRANSACTION_ID_MAX_LEN};
use crate::AppState;

/// Query string of the processor's buyer return / callback.
#[derive(Debug, Default, Deserialize)]
pub struct CallbackQuery {
    #[serde(rename = "GatewayTransactionId")]
    pub gateway_transaction_id: Option<String>,
    #[serde(rename = "MerchantTransactionId")]
    pub merchant_transaction_id: Option<String>,
    pub order_id: Option<String>,
    #[serde(rename = "TrnxId")]
    pub reference_id: Option<String>,
}

impl CallbackQuery {
    pub fn into_params(self) -> Result<CallbackParams, AppError> {
        let gateway_transaction_id = non_empty_param(self.gateway_transaction_id.as_deref());
        let merchant_transaction_id = non_empty_param(self.merchant_transaction_id.as_deref());

        for (field, value) in [
            ("GatewayTransactionId", &gateway_transaction_id),
            ("MerchantTransactionId", &merchant_transaction_id),
        ] {
            if let Some(value) = value {
                validate_max_len(field, value, TRANSACTION_ID_MAX_LEN)
                    .map_err(|e| AppError::BadRequest(e.to_string()))?;
            }
        }

        // Non-numeric order ids count as absent.
        let order_id = non_empty_param(self.order_id.as_deref())
            .and_then(|raw| raw.parse::<i64>().ok())
            .filter(|id| *id > 0);

        Ok(CallbackParams {
            gateway_transaction_id,
            merchant_transaction_id,
            order_id,
            reference_id: non_empty_param(self.reference_id.as_deref()),
        })
    }
}

/// GET /mypay/callback
pub async fn callback(
    State(state): State<AppState>,
    Query(query): Query<CallbackQuery>,
) -> Result<Redirect, AppError> {
    let params = query.into_params()?;
    let outcome = state.reconciler.handle_callback(params).await?;
    Ok(Redirect::to(&outcome.redirect_url))
}
