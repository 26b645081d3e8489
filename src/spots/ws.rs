use axum::{
    debug_handler,
    extract::{
        ws::{Message, WebSocket},
        Path, State, WebSocketUpgrade,
    },
    response::Response,
};
use futures_util::{stream::SplitSink, SinkExt, StreamExt};
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::{
    config::CapacityPolicy,
    db::ChatMessage,
    notify::{ChangeFeed, ChangeFilter, ChangeHub, Table},
    session::RequireUser,
    AppResult,
};

use super::{chat::ChatSession, gate, repo};

#[derive(Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
enum ClientEvent {
    Join,
    Send { content: String },
}

#[derive(Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
enum ServerEvent<'a> {
    History { messages: &'a [ChatMessage] },
    Joined,
    Error { message: String },
}

#[debug_handler(state = crate::AppState)]
pub(crate) async fn spot_ws(
    Path(spot_id): Path<Uuid>,
    State(db_pool): State<SqlitePool>,
    State(changes): State<ChangeHub>,
    State(policy): State<CapacityPolicy>,
    RequireUser(user_id): RequireUser,

    ws: WebSocketUpgrade,
) -> AppResult<Response> {
    let spot = repo::get_spot(&db_pool, &spot_id.to_string()).await?;
    let member = gate::is_member(&db_pool, &spot.id, &user_id).await?;

    Ok(ws.on_upgrade(move |stream| async move {
        run_chat(stream, db_pool, changes, policy, user_id, spot_id, member).await;
    }))
}

/// One connection drives one [`ChatSession`]: a member gets the history up
/// front and again on every matching change-feed trigger (full re-fetch); a
/// non-member may only ask to join. Closing the socket closes the feed and
/// the session, after which late results are dropped on the floor.
async fn run_chat(
    stream: WebSocket,
    db_pool: SqlitePool,
    changes: ChangeHub,
    policy: CapacityPolicy,
    user_id: String,
    spot_id: Uuid,
    member: bool,
) {
    let (mut sender, mut receiver) = stream.split();
    let id = spot_id.to_string();

    let mut session = ChatSession::new(member);
    let mut feed = None;

    if session.is_member() {
        feed = Some(changes.watch(ChangeFilter::spot(Table::Messages, spot_id)));
        if !refresh(&db_pool, &user_id, &id, &mut session, &mut sender).await {
            return;
        }
    }

    loop {
        // resolve the winning arm first so its handler is free to touch the
        // feed and the session
        enum Step {
            Changed(Option<()>),
            Incoming(Option<Result<Message, axum::Error>>),
        }

        let step = tokio::select! {
            changed = next_change(&mut feed) => Step::Changed(changed),
            incoming = receiver.next() => Step::Incoming(incoming),
        };

        match step {
            Step::Changed(None) => break,
            Step::Changed(Some(())) => {
                if !refresh(&db_pool, &user_id, &id, &mut session, &mut sender).await {
                    break;
                }
            }
            Step::Incoming(incoming) => {
                let Some(Ok(frame)) = incoming else {
                    break;
                };
                let Ok(event) = serde_json::from_slice(&frame.into_data()) else {
                    continue;
                };

                match event {
                    ClientEvent::Join => {
                        // begin_join is the in-flight guard: a second click
                        // while joining goes nowhere
                        if !session.begin_join() {
                            continue;
                        }
                        let joined =
                            repo::join_spot(&db_pool, &changes, policy, &user_id, &id).await;
                        session.finish_join(joined.is_ok());
                        match joined {
                            Ok(()) => {
                                feed = Some(
                                    changes.watch(ChangeFilter::spot(Table::Messages, spot_id)),
                                );
                                if send_event(&mut sender, &ServerEvent::Joined).await.is_err() {
                                    break;
                                }
                                if !refresh(&db_pool, &user_id, &id, &mut session, &mut sender)
                                    .await
                                {
                                    break;
                                }
                            }
                            Err(err) => {
                                let event = ServerEvent::Error { message: err.to_string() };
                                if send_event(&mut sender, &event).await.is_err() {
                                    break;
                                }
                            }
                        }
                    }
                    ClientEvent::Send { content } => {
                        if let Err(err) =
                            repo::send_message(&db_pool, &changes, &user_id, &id, &content).await
                        {
                            let event = ServerEvent::Error { message: err.to_string() };
                            if send_event(&mut sender, &event).await.is_err() {
                                break;
                            }
                        }
                        // the history lands via the change feed trigger
                    }
                }
            }
        }
    }

    if let Some(feed) = feed.as_mut() {
        feed.close();
    }
    session.close();
}

async fn next_change(feed: &mut Option<ChangeFeed>) -> Option<()> {
    match feed {
        Some(feed) => feed.changed().await,
        // a non-member has nothing to wait on
        None => std::future::pending().await,
    }
}

/// Full re-fetch plus push. False means the view is done for: the spot is
/// gone, membership was revoked, or the socket dropped.
async fn refresh(
    db_pool: &SqlitePool,
    user_id: &str,
    spot_id: &str,
    session: &mut ChatSession,
    sender: &mut SplitSink<WebSocket, Message>,
) -> bool {
    let Ok(messages) = repo::messages_of(db_pool, user_id, spot_id).await else {
        return false;
    };
    session.replace_messages(messages);

    send_event(sender, &ServerEvent::History { messages: session.messages() })
        .await
        .is_ok()
}

async fn send_event(
    sender: &mut SplitSink<WebSocket, Message>,
    event: &ServerEvent<'_>,
) -> Result<(), axum::Error> {
    let json = serde_json::to_string(event).unwrap_or_default();
    sender.send(json.into()).await
}
