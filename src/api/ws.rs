use {
    crate::{
        auction::entities::Auction,
        bid::entities::Bid,
        kernel::entities::{
            AuctionId,
            Cents,
            UserId,
        },
        server::{
            EXIT_CHECK_INTERVAL,
            SHOULD_EXIT,
        },
        state::ServerState,
    },
    anyhow::{
        anyhow,
        Result,
    },
    axum::{
        extract::{
            ws::{
                Message,
                WebSocket,
            },
            State,
            WebSocketUpgrade,
        },
        response::IntoResponse,
    },
    futures::{
        stream::{
            SplitSink,
            SplitStream,
        },
        SinkExt,
        StreamExt,
    },
    serde::{
        Deserialize,
        Serialize,
    },
    std::{
        collections::HashSet,
        sync::{
            atomic::Ordering,
            Arc,
        },
        time::Duration,
    },
    time::OffsetDateTime,
    tokio::sync::broadcast,
    utoipa::ToSchema,
};

/// Everything the engine announces. Broadcast once per state change; each
/// subscriber filters by its own topic set.
#[derive(Serialize, Clone, Debug, ToSchema)]
#[serde(tag = "type")]
pub enum UpdateEvent {
    #[serde(rename = "AUCTION_CREATED", rename_all = "camelCase")]
    AuctionCreated { auction: Auction },
    #[serde(rename = "AUCTION_STARTED", rename_all = "camelCase")]
    AuctionStarted { auction: Auction },
    #[serde(rename = "AUCTION_UPDATED", rename_all = "camelCase")]
    AuctionUpdated { auction: Auction },
    #[serde(rename = "AUCTION_ENDED", rename_all = "camelCase")]
    AuctionEnded {
        auction:     Auction,
        winner_id:   Option<UserId>,
        final_price: Cents,
    },
    #[serde(rename = "AUCTION_ENDING_SOON", rename_all = "camelCase")]
    AuctionEndingSoon {
        auction:        Auction,
        /// Seconds until the hard close.
        time_remaining: i64,
    },
    #[serde(rename = "BID_PLACED", rename_all = "camelCase")]
    BidPlaced {
        bid:                Bid,
        auction:            Auction,
        is_winning:         bool,
        previous_winner_id: Option<UserId>,
    },
    #[serde(rename = "BID_RETRACTED", rename_all = "camelCase")]
    BidRetracted {
        bid:             Bid,
        auction:         Auction,
        previous_winner: Option<UserId>,
    },
    #[serde(rename = "YOU_WERE_OUTBID", rename_all = "camelCase")]
    YouWereOutbid {
        auction_id:      AuctionId,
        previous_amount: Cents,
        new_amount:      Cents,
        new_leader_id:   UserId,
        target_user_id:  UserId,
    },
}

impl UpdateEvent {
    pub fn auction_id(&self) -> AuctionId {
        match self {
            UpdateEvent::AuctionCreated { auction }
            | UpdateEvent::AuctionStarted { auction }
            | UpdateEvent::AuctionUpdated { auction }
            | UpdateEvent::AuctionEnded { auction, .. }
            | UpdateEvent::AuctionEndingSoon { auction, .. } => auction.id,
            UpdateEvent::BidPlaced { bid, .. } | UpdateEvent::BidRetracted { bid, .. } => {
                bid.auction_id
            }
            UpdateEvent::YouWereOutbid { auction_id, .. } => *auction_id,
        }
    }

    /// Whether the event is also delivered on the global topic, or only to
    /// subscribers of its auction.
    pub fn is_global(&self) -> bool {
        !matches!(
            self,
            UpdateEvent::AuctionEndingSoon { .. }
                | UpdateEvent::AuctionUpdated { .. }
                | UpdateEvent::YouWereOutbid { .. }
        )
    }
}

pub struct WsState {
    pub subscriber_counter: std::sync::atomic::AtomicUsize,
    pub broadcast_sender:   broadcast::Sender<UpdateEvent>,
    pub broadcast_receiver: broadcast::Receiver<UpdateEvent>,
}

#[derive(Deserialize, Debug, Clone)]
#[serde(tag = "type")]
enum ClientMessage {
    #[serde(rename = "subscribe_auction", rename_all = "camelCase")]
    SubscribeAuction { auction_id: AuctionId },
    #[serde(rename = "unsubscribe_auction", rename_all = "camelCase")]
    UnsubscribeAuction { auction_id: AuctionId },
    #[serde(rename = "subscribe_global")]
    SubscribeGlobal,
    #[serde(rename = "unsubscribe_global")]
    UnsubscribeGlobal,
}

#[derive(Serialize, Debug, Clone)]
#[serde(tag = "status")]
enum ServerResponseMessage {
    #[serde(rename = "success")]
    Success,
    #[serde(rename = "error")]
    Err { error: String },
}

/// Events go out tagged with the event name and an ISO-8601 timestamp.
#[derive(Serialize, Clone)]
struct EventMessage {
    #[serde(with = "time::serde::rfc3339")]
    timestamp: OffsetDateTime,
    #[serde(flatten)]
    event:     UpdateEvent,
}

pub async fn ws_route_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<ServerState>>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| websocket_handler(socket, state))
}

async fn websocket_handler(stream: WebSocket, state: Arc<ServerState>) {
    let ws_state = &state.ws;
    let id = ws_state.subscriber_counter.fetch_add(1, Ordering::SeqCst);
    let notify_receiver = ws_state.broadcast_receiver.resubscribe();
    let (sender, receiver) = stream.split();
    let mut subscriber = Subscriber::new(id, state.clone(), notify_receiver, receiver, sender);
    subscriber.run().await;
}

pub type SubscriberId = usize;

const PING_INTERVAL_DURATION: Duration = Duration::from_secs(30);

/// Subscriber is an actor that handles a single websocket connection. It
/// listens to the broadcast channel for updates and forwards the ones its
/// topics cover.
pub struct Subscriber {
    id:                  SubscriberId,
    closed:              bool,
    state:               Arc<ServerState>,
    notify_receiver:     broadcast::Receiver<UpdateEvent>,
    receiver:            SplitStream<WebSocket>,
    sender:              SplitSink<WebSocket, Message>,
    auction_ids:         HashSet<AuctionId>,
    global:              bool,
    ping_interval:       tokio::time::Interval,
    exit_check_interval: tokio::time::Interval,
    responded_to_ping:   bool,
}

impl Subscriber {
    pub fn new(
        id: SubscriberId,
        state: Arc<ServerState>,
        notify_receiver: broadcast::Receiver<UpdateEvent>,
        receiver: SplitStream<WebSocket>,
        sender: SplitSink<WebSocket, Message>,
    ) -> Self {
        Self {
            id,
            closed: false,
            state,
            notify_receiver,
            receiver,
            sender,
            auction_ids: HashSet::new(),
            global: false,
            ping_interval: tokio::time::interval(PING_INTERVAL_DURATION),
            exit_check_interval: tokio::time::interval(EXIT_CHECK_INTERVAL),
            responded_to_ping: true, // We start with true so we don't close the connection immediately
        }
    }

    #[tracing::instrument(skip(self), fields(subscriber = self.id))]
    pub async fn run(&mut self) {
        while !self.closed {
            if let Err(e) = self.handle_next().await {
                tracing::debug!(subscriber = self.id, error = ?e, "Error handling subscriber message.");
                break;
            }
        }
    }

    async fn handle_next(&mut self) -> Result<()> {
        tokio::select! {
            maybe_update_event = self.notify_receiver.recv() => {
                match maybe_update_event {
                    Ok(event) => self.handle_update(event).await,
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        // Delivery is best-effort; a slow client just misses
                        // the skipped events.
                        tracing::debug!(subscriber = self.id, skipped, "Subscriber lagged behind the event stream.");
                        Ok(())
                    }
                    Err(broadcast::error::RecvError::Closed) => {
                        Err(anyhow!("Update channel closed. This should never happen. Closing connection."))
                    }
                }
            },
            maybe_message_or_err = self.receiver.next() => {
                self.handle_client_message(
                    maybe_message_or_err.ok_or(anyhow!("Client channel is closed"))??
                ).await
            },
            _ = self.ping_interval.tick() => {
                if !self.responded_to_ping {
                    return Err(anyhow!("Subscriber did not respond to ping. Closing connection."));
                }
                self.responded_to_ping = false;
                self.sender.send(Message::Ping(vec![])).await?;
                Ok(())
            },
            _ = self.exit_check_interval.tick() => {
                if SHOULD_EXIT.load(Ordering::Acquire) {
                    self.sender.close().await?;
                    self.closed = true;
                    return Err(anyhow!("Application is shutting down. Closing connection."));
                }
                Ok(())
            }
        }
    }

    async fn handle_update(&mut self, event: UpdateEvent) -> Result<()> {
        let subscribed = self.auction_ids.contains(&event.auction_id())
            || (self.global && event.is_global());
        if !subscribed {
            // Irrelevant update
            return Ok(());
        }
        let message = serde_json::to_string(&EventMessage {
            timestamp: OffsetDateTime::now_utc(),
            event,
        })?;
        self.sender.send(message.into()).await?;
        Ok(())
    }

    async fn send_response(&mut self, response: ServerResponseMessage) -> Result<()> {
        self.sender
            .send(serde_json::to_string(&response)?.into())
            .await?;
        Ok(())
    }

    #[tracing::instrument(skip(self, message), fields(subscriber = self.id))]
    async fn handle_client_message(&mut self, message: Message) -> Result<()> {
        let maybe_client_message = match message {
            Message::Close(_) => {
                // Closing the connection. Dropping the Subscriber drops its
                // broadcast receiver; nothing to unregister.
                tracing::trace!(id = self.id, "Subscriber closed connection.");

                // Send the close message to gracefully shut down the connection
                // Otherwise the client might get an abnormal Websocket closure
                // error.
                self.sender.close().await?;
                self.closed = true;
                return Ok(());
            }
            Message::Text(text) => serde_json::from_str::<ClientMessage>(&text),
            Message::Binary(data) => serde_json::from_slice::<ClientMessage>(&data),
            Message::Ping(_) => {
                // Axum will send Pong automatically
                return Ok(());
            }
            Message::Pong(_) => {
                self.responded_to_ping = true;
                return Ok(());
            }
        };

        match maybe_client_message {
            Err(e) => {
                return self
                    .send_response(ServerResponseMessage::Err {
                        error: e.to_string(),
                    })
                    .await;
            }
            Ok(ClientMessage::SubscribeAuction { auction_id }) => {
                if self.state.store.get_auction(auction_id).await.is_none() {
                    return self
                        .send_response(ServerResponseMessage::Err {
                            error: format!("Auction with id {} not found", auction_id),
                        })
                        .await;
                }
                self.auction_ids.insert(auction_id);
            }
            Ok(ClientMessage::UnsubscribeAuction { auction_id }) => {
                self.auction_ids.remove(&auction_id);
            }
            Ok(ClientMessage::SubscribeGlobal) => {
                self.global = true;
            }
            Ok(ClientMessage::UnsubscribeGlobal) => {
                self.global = false;
            }
        }

        self.send_response(ServerResponseMessage::Success).await
    }
}
