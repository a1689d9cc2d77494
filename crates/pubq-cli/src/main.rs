//! End-to-end demo: directory upsert, enqueue, flaky publisher, retries,
//! terminal state, engagement and guestbook writes.

use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};

use async_trait::async_trait;
use tokio::time::{Duration, sleep};
use tracing::info;
use tracing_subscriber::EnvFilter;

use pubq_core::domain::{NaverResult, PostPayload, RestaurantContext};
use pubq_core::queue::{
    InMemoryPublishQueue, ItemState, PublishQueue, QueueConfig, QueueItemRecord, StatusScan,
};
use pubq_core::store::{EngagementLog, Guestbook, RestaurantDirectory};
use pubq_core::worker::{Publisher, StaleSweeper, WorkerGroup};

/// Fails the first `n` publish attempts, then succeeds. Stands in for the
/// real platform client so the retry path is visible in the demo.
struct FlakyNaverPublisher {
    remaining_failures: AtomicU32,
}

impl FlakyNaverPublisher {
    fn new(n: u32) -> Self {
        Self {
            remaining_failures: AtomicU32::new(n),
        }
    }
}

#[async_trait]
impl Publisher<NaverResult> for FlakyNaverPublisher {
    async fn publish(&self, item: &QueueItemRecord<NaverResult>) -> Result<NaverResult, String> {
        let left = self.remaining_failures.load(Ordering::Relaxed);
        if left > 0 {
            self.remaining_failures.fetch_sub(1, Ordering::Relaxed);
            return Err(format!("intentional failure (left={left})"));
        }
        Ok(NaverResult {
            naver_url: format!("https://blog.naver.example/{}", item.payload.post_id),
        })
    }
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // (A) Restaurant directory: upsert + visits feed the enqueue context.
    let directory = RestaurantDirectory::new();
    directory
        .upsert(
            "Mokmyeok Sundubu",
            Some("Myeong-dong 8-gil 27"),
            "naver-place-1234",
        )
        .await
        .expect("upsert restaurant");
    directory
        .record_visit("naver-place-1234")
        .await
        .expect("record visit");
    let restaurant = directory
        .record_visit("naver-place-1234")
        .await
        .expect("record visit");
    info!(
        restaurant = %restaurant.id,
        visits = restaurant.visit_count,
        "restaurant ready"
    );

    // (B) Queue, workers, sweeper.
    let queue: Arc<InMemoryPublishQueue<NaverResult>> =
        Arc::new(InMemoryPublishQueue::new(QueueConfig::default()));
    let publisher = Arc::new(FlakyNaverPublisher::new(2));

    let workers = WorkerGroup::spawn(
        2,
        queue.clone() as Arc<dyn PublishQueue<NaverResult>>,
        publisher as Arc<dyn Publisher<NaverResult>>,
        Duration::from_millis(50),
        "worker",
    );
    let sweeper = StaleSweeper::spawn(
        queue.clone() as Arc<dyn PublishQueue<NaverResult>>,
        Duration::from_secs(5),
        chrono::Duration::minutes(5),
    );

    // (C) Enqueue one post with the denormalized restaurant context.
    let payload = PostPayload::new(
        "post-001",
        "Best sundubu in Myeong-dong",
        "Soft tofu stew that survives the lunch rush.",
    )
    .with_tags(vec!["sundubu".into(), "myeongdong".into()])
    .with_image_url("https://img.example/sundubu.jpg");

    let item = queue
        .enqueue(payload, RestaurantContext::from_record(&restaurant))
        .await
        .expect("enqueue post");
    info!(item = %item.id, platform = %item.platform(), "enqueued");

    // (D) Poll until the item reaches a terminal state.
    loop {
        let record = queue.get(item.id).await.expect("get").expect("item exists");
        if record.state.is_terminal() {
            info!(
                state = %record.state,
                retries = record.retry_count,
                url = record.result.as_ref().map(|r| r.naver_url.as_str()),
                "final status"
            );
            break;
        }
        sleep(Duration::from_millis(50)).await;
    }

    let counts = queue.counts_by_state().await.expect("counts");
    info!(?counts, "queue counts");

    let mut scan = StatusScan::new(ItemState::Published, 10);
    for published in scan.next_page(queue.as_ref()).await.expect("scan") {
        info!(item = %published.id, post = %published.payload.post_id, "published");
    }

    // (E) Readers engage with the published post.
    let engagement = EngagementLog::new();
    engagement.record_view(&item.payload.post_id).await;
    engagement.record_view(&item.payload.post_id).await;
    engagement.record_like(&item.payload.post_id).await;
    info!(
        views = engagement.view_count(&item.payload.post_id).await,
        likes = engagement.like_count(&item.payload.post_id).await,
        "engagement"
    );

    let guestbook = Guestbook::new();
    let entry = guestbook
        .leave("hungry_dev", "The sundubu post made me book a trip.")
        .await
        .expect("leave entry");
    guestbook
        .attach_reply(entry.id, "Enjoy the trip!")
        .await
        .expect("attach reply");
    info!(entries = guestbook.entries().await.len(), "guestbook");

    workers.shutdown_and_join().await;
    sweeper.shutdown_and_join().await;
}
