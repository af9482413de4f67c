use rocket::{
    futures::StreamExt,
    response::stream::{Event, EventStream},
    tokio::select,
    Route, Shutdown, State,
};

use crate::{
    config::Config,
    error::Result,
    model::{
        api::auth::{AuthToken, Organizer},
        mongodb::Id,
    },
    service::TallyEngine,
};

pub fn routes() -> Vec<Route> {
    routes![live_counts_stream]
}

/// Push the election's live counts to its owner every refresh interval as
/// `counts` events. The feed stops when the viewer disconnects, the
/// election goes away, or the server shuts down.
#[get("/elections/<election_id>/counts/stream")]
async fn live_counts_stream(
    token: AuthToken<Organizer>,
    election_id: Id,
    tally: TallyEngine,
    config: &State<Config>,
    mut shutdown: Shutdown,
) -> Result<EventStream![]> {
    // Check ownership up front so that strangers get a proper error status.
    tally.owner_live_counts(election_id, token.id()).await?;

    let period = config
        .live_refresh()
        .to_std()
        .unwrap_or(std::time::Duration::from_millis(4500));
    let mut feed = Box::pin(tally.live_feed(election_id, period));
    debug!("Opened live feed for election {election_id}");

    Ok(EventStream! {
        loop {
            let counts = select! {
                next = feed.next() => match next {
                    Some(Ok(counts)) => counts,
                    Some(Err(e)) => {
                        debug!("Live feed for election {election_id} ended: {e}");
                        break;
                    }
                    None => break,
                },
                _ = &mut shutdown => break,
            };
            yield Event::json(&counts).event("counts");
        }
    })
}
