use super::view::{render_page, render_rows};
use anyhow::Context;
use birdnestcore::model::Violation;
use birdnestcore::prelude::PresentationSink;
use futures_util::Stream;
use log::debug;
use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::{Arc, RwLock};
use tokio::sync::broadcast::{self, error::RecvError};
use tokio::task::JoinHandle;
use warp::sse::Event;
use warp::Filter;

const EVENT_BUFFER: usize = 16;

/// Web front end: serves the rendered page and pushes table updates over SSE.
pub struct WebBridge {
    page: Arc<RwLock<String>>,
    events: broadcast::Sender<String>,
}

impl WebBridge {
    pub fn new() -> Self {
        let (events, _) = broadcast::channel(EVENT_BUFFER);
        Self {
            page: Arc::new(RwLock::new(render_page(&render_rows(&[])))),
            events,
        }
    }

    pub fn routes(
        &self,
    ) -> impl Filter<Extract = (impl warp::Reply,), Error = warp::Rejection> + Clone {
        let page = Arc::clone(&self.page);
        let home = warp::path::end().and(warp::get()).map(move || {
            let body = page.read().map(|page| page.clone()).unwrap_or_default();
            warp::reply::html(body)
        });

        let events = self.events.clone();
        let updates = warp::path("events")
            .and(warp::path::end())
            .and(warp::get())
            .map(move || {
                let stream = row_updates(events.subscribe());
                warp::sse::reply(warp::sse::keep_alive().stream(stream))
            });

        home.or(updates)
    }

    /// Binds the HTTP server and runs it on the current runtime.
    pub fn serve(&self, addr: SocketAddr) -> anyhow::Result<(SocketAddr, JoinHandle<()>)> {
        let (bound, server) = warp::serve(self.routes())
            .try_bind_ephemeral(addr)
            .with_context(|| format!("binding web server to {}", addr))?;
        Ok((bound, tokio::spawn(server)))
    }

    #[cfg(test)]
    pub fn page(&self) -> String {
        self.page.read().unwrap().clone()
    }
}

impl Default for WebBridge {
    fn default() -> Self {
        Self::new()
    }
}

impl PresentationSink for WebBridge {
    fn on_change(&self, snapshot: &[Violation]) {
        let rows = render_rows(snapshot);
        if let Ok(mut page) = self.page.write() {
            *page = render_page(&rows);
        }
        // No subscribers is fine; the page above still reflects the change.
        let _ = self.events.send(rows);
        debug!("published {} violations", snapshot.len());
    }
}

fn row_updates(
    receiver: broadcast::Receiver<String>,
) -> impl Stream<Item = Result<Event, Infallible>> + Send + 'static {
    futures_util::stream::unfold(receiver, |mut receiver| async move {
        loop {
            match receiver.recv().await {
                Ok(rows) => return Some((Ok(Event::default().data(rows)), receiver)),
                Err(RecvError::Lagged(skipped)) => {
                    debug!("event subscriber skipped {} updates", skipped);
                }
                Err(RecvError::Closed) => return None,
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use birdnestcore::model::Pilot;
    use chrono::Utc;
    use futures_util::StreamExt;

    fn violation(first_name: &str) -> Violation {
        Violation::first_sighting(
            "SN-1",
            Pilot {
                pilot_id: "P-1".into(),
                first_name: first_name.into(),
                last_name: "Tester".into(),
                phone_number: "+123".into(),
                email: "bob@email.com".into(),
                created_dt: Utc::now(),
            },
            42.0,
            Utc::now(),
        )
    }

    #[test]
    fn bridge_updates_page_on_change() {
        let bridge = WebBridge::new();
        assert!(bridge.page().contains("No violations"));
        bridge.on_change(&[violation("Bob")]);
        assert!(bridge.page().contains("Bob Tester"));
    }

    #[tokio::test]
    async fn subscribers_receive_rendered_rows() {
        let bridge = WebBridge::new();
        let mut stream = Box::pin(row_updates(bridge.events.subscribe()));
        bridge.on_change(&[violation("Billy")]);

        let event = stream.next().await.unwrap().unwrap();
        assert!(event.to_string().contains("Billy Tester"));
    }

    #[tokio::test]
    async fn server_serves_latest_page() {
        let bridge = WebBridge::new();
        let (addr, server) = bridge
            .serve(SocketAddr::from(([127, 0, 0, 1], 0)))
            .unwrap();
        bridge.on_change(&[violation("Bob")]);

        let body = reqwest::get(format!("http://{}/", addr))
            .await
            .unwrap()
            .text()
            .await
            .unwrap();
        assert!(body.contains("Bob Tester"));
        server.abort();
    }
}
