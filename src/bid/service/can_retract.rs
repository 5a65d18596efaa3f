use {
    super::Service,
    crate::{
        api::RestError,
        kernel::entities::{
            BidId,
            UserId,
        },
    },
    serde::Serialize,
    time::OffsetDateTime,
    utoipa::ToSchema,
};

pub struct CanRetractInput {
    pub bid_id:  BidId,
    pub user_id: UserId,
}

#[derive(Clone, Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CanRetract {
    pub can_retract: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason:      Option<String>,
}

impl Service {
    /// Advisory preflight for the retraction rules; read-only, so it runs
    /// outside the auction lock.
    pub async fn can_retract(&self, input: CanRetractInput) -> Result<CanRetract, RestError> {
        let bid = self
            .store
            .get_bid(input.bid_id)
            .await
            .ok_or(RestError::BidNotFound)?;
        let auction = self
            .store
            .get_auction(bid.auction_id)
            .await
            .ok_or(RestError::AuctionNotFound)?;
        let now = OffsetDateTime::now_utc();
        Ok(
            match self.check_retraction(&bid, &auction, input.user_id, now) {
                Ok(()) => CanRetract {
                    can_retract: true,
                    reason:      None,
                },
                Err(err) => CanRetract {
                    can_retract: false,
                    reason:      Some(err.to_string()),
                },
            },
        )
    }
}
