use {
    super::Service,
    crate::{
        api::{
            ws::UpdateEvent,
            RestError,
        },
        auction::entities::{
            Auction,
            AuctionStatus,
            NO_TIME_LIMIT_DURATION,
        },
        kernel::entities::{
            Cents,
            UserId,
            MAX_AMOUNT,
        },
    },
    time::{
        Duration,
        OffsetDateTime,
    },
    uuid::Uuid,
};

const MAX_TITLE_LENGTH: usize = 200;
/// Tolerance for client clock skew on the requested start time.
const START_TIME_SLACK: Duration = Duration::seconds(5);

pub struct CreateAuctionInput {
    pub title:                 String,
    pub description:           String,
    pub starting_price:        Cents,
    pub minimum_bid_increment: Option<Cents>,
    pub reserve_price:         Option<Cents>,
    pub buy_now_price:         Option<Cents>,
    pub start_time:            Option<OffsetDateTime>,
    pub end_time:              Option<OffsetDateTime>,
    pub has_time_limit:        bool,
    pub created_by:            UserId,
}

impl Service {
    #[tracing::instrument(skip_all, fields(auction_id, created_by = %input.created_by))]
    pub async fn create_auction(&self, input: CreateAuctionInput) -> Result<Auction, RestError> {
        let now = OffsetDateTime::now_utc();
        self.store
            .get_user(input.created_by)
            .await
            .ok_or(RestError::UserNotFound)?;

        let start_time = input.start_time.unwrap_or(now);
        if start_time < now - START_TIME_SLACK {
            return Err(RestError::BadParameters(
                "start time must not be in the past".to_string(),
            ));
        }
        let end_time = if input.has_time_limit {
            let end_time = input.end_time.ok_or_else(|| {
                RestError::BadParameters(
                    "end time is required for a time-limited auction".to_string(),
                )
            })?;
            if end_time - start_time < self.config.min_auction_duration() {
                return Err(RestError::BadParameters(format!(
                    "auction must run for at least {} seconds",
                    self.config.min_auction_duration().whole_seconds()
                )));
            }
            end_time
        } else {
            start_time + NO_TIME_LIMIT_DURATION
        };

        let status = if start_time <= now {
            AuctionStatus::Active
        } else {
            AuctionStatus::Pending
        };
        let mut auction = Auction {
            id: Uuid::new_v4(),
            title: input.title,
            description: input.description,
            starting_price: input.starting_price,
            current_price: input.starting_price,
            minimum_bid_increment: input.minimum_bid_increment.unwrap_or(1),
            reserve_price: input.reserve_price,
            buy_now_price: input.buy_now_price,
            reserve_met: false,
            start_time,
            end_time,
            has_time_limit: input.has_time_limit,
            status,
            created_by: input.created_by,
            winner_id: None,
            bid_count: 0,
            created_at: now,
        };
        auction.refresh_reserve_met();
        validate_auction(&auction)?;

        self.store.add_auction(auction.clone()).await?;
        tracing::Span::current().record("auction_id", auction.id.to_string());
        tracing::info!(auction_id = %auction.id, status = %auction.status, "Auction created.");

        self.broadcast(UpdateEvent::AuctionCreated {
            auction: auction.clone(),
        });
        Ok(auction)
    }
}

/// Field validations shared by create and update.
pub(super) fn validate_auction(auction: &Auction) -> Result<(), RestError> {
    if auction.title.trim().is_empty() {
        return Err(RestError::BadParameters("title must not be empty".to_string()));
    }
    if auction.title.chars().count() > MAX_TITLE_LENGTH {
        return Err(RestError::BadParameters(format!(
            "title must be at most {} characters",
            MAX_TITLE_LENGTH
        )));
    }
    if auction.description.trim().is_empty() {
        return Err(RestError::BadParameters(
            "description must not be empty".to_string(),
        ));
    }
    if auction.starting_price < 0 || auction.starting_price > MAX_AMOUNT {
        return Err(RestError::BadParameters(
            "starting price is out of range".to_string(),
        ));
    }
    if auction.minimum_bid_increment <= 0 {
        return Err(RestError::BadParameters(
            "minimum bid increment must be positive".to_string(),
        ));
    }
    if auction.end_time <= auction.start_time {
        return Err(RestError::BadParameters(
            "end time must be after start time".to_string(),
        ));
    }
    for amount in [auction.reserve_price, auction.buy_now_price].into_iter().flatten() {
        if amount <= 0 || amount > MAX_AMOUNT {
            return Err(RestError::BadParameters(
                "price is out of range".to_string(),
            ));
        }
    }
    if let Some(reserve) = auction.reserve_price {
        if reserve < auction.starting_price {
            return Err(RestError::BadParameters(
                "reserve price must not be below the starting price".to_string(),
            ));
        }
    }
    if let Some(buy_now) = auction.buy_now_price {
        if buy_now <= auction.reserve_price.unwrap_or(auction.starting_price) {
            return Err(RestError::BadParameters(
                "buy now price must exceed the reserve and starting price".to_string(),
            ));
        }
    }
    Ok(())
}

#[cfg(test)]
pub mod tests {
    use {
        super::*,
        crate::auction::{
            entities::User,
            service::tests::new_for_test,
        },
    };

    pub async fn seeded_user(service: &Service, name: &str) -> UserId {
        let user = User {
            id:         Uuid::new_v4(),
            name:       name.to_string(),
            email:      format!("{}@example.com", name.to_lowercase().replace(' ', ".")),
            created_at: OffsetDateTime::now_utc(),
        };
        service.store.add_user(user.clone()).await.unwrap();
        user.id
    }

    pub fn base_input(created_by: UserId) -> CreateAuctionInput {
        let now = OffsetDateTime::now_utc();
        CreateAuctionInput {
            title:                 "Carved oak writing desk".to_string(),
            description:           "Late 19th century, restored".to_string(),
            starting_price:        10_000,
            minimum_bid_increment: None,
            reserve_price:         None,
            buy_now_price:         None,
            start_time:            Some(now),
            end_time:              Some(now + Duration::days(1)),
            has_time_limit:        true,
            created_by,
        }
    }

    #[tokio::test]
    async fn creates_an_active_auction_when_start_time_has_passed() {
        let (service, _events) = new_for_test();
        let seller = seeded_user(&service, "Seller").await;
        let auction = service.create_auction(base_input(seller)).await.unwrap();
        assert_eq!(auction.status, AuctionStatus::Active);
        assert_eq!(auction.current_price, auction.starting_price);
        assert!(auction.reserve_met);
    }

    #[tokio::test]
    async fn future_start_time_creates_a_pending_auction() {
        let (service, _events) = new_for_test();
        let seller = seeded_user(&service, "Seller").await;
        let mut input = base_input(seller);
        let start = OffsetDateTime::now_utc() + Duration::hours(1);
        input.start_time = Some(start);
        input.end_time = Some(start + Duration::days(1));
        let auction = service.create_auction(input).await.unwrap();
        assert_eq!(auction.status, AuctionStatus::Pending);
    }

    #[tokio::test]
    async fn no_time_limit_gets_the_far_future_end() {
        let (service, _events) = new_for_test();
        let seller = seeded_user(&service, "Seller").await;
        let mut input = base_input(seller);
        input.has_time_limit = false;
        input.end_time = None;
        let auction = service.create_auction(input).await.unwrap();
        assert_eq!(auction.end_time, auction.start_time + NO_TIME_LIMIT_DURATION);
    }

    #[tokio::test]
    async fn rejects_bad_reserve_and_buy_now_ordering() {
        let (service, _events) = new_for_test();
        let seller = seeded_user(&service, "Seller").await;

        let mut below_start = base_input(seller);
        below_start.reserve_price = Some(5_000);
        assert!(matches!(
            service.create_auction(below_start).await,
            Err(RestError::BadParameters(_))
        ));

        let mut buy_now_below_reserve = base_input(seller);
        buy_now_below_reserve.reserve_price = Some(30_000);
        buy_now_below_reserve.buy_now_price = Some(30_000);
        assert!(matches!(
            service.create_auction(buy_now_below_reserve).await,
            Err(RestError::BadParameters(_))
        ));
    }

    #[tokio::test]
    async fn rejects_past_start_and_short_duration() {
        let (service, _events) = new_for_test();
        let seller = seeded_user(&service, "Seller").await;

        let mut past_start = base_input(seller);
        past_start.start_time = Some(OffsetDateTime::now_utc() - Duration::minutes(1));
        assert!(matches!(
            service.create_auction(past_start).await,
            Err(RestError::BadParameters(_))
        ));

        let mut too_short = base_input(seller);
        let now = OffsetDateTime::now_utc();
        too_short.start_time = Some(now);
        too_short.end_time = Some(now + Duration::minutes(1));
        assert!(matches!(
            service.create_auction(too_short).await,
            Err(RestError::BadParameters(_))
        ));
    }

    #[tokio::test]
    async fn rejects_titles_over_the_limit() {
        let (service, _events) = new_for_test();
        let seller = seeded_user(&service, "Seller").await;
        let mut input = base_input(seller);
        input.title = "x".repeat(MAX_TITLE_LENGTH + 1);
        assert!(matches!(
            service.create_auction(input).await,
            Err(RestError::BadParameters(_))
        ));
    }
}
