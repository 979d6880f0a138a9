use std::{
    fmt::Debug,
    sync::Arc,
    time::{Duration, Instant},
};

use crate::webserver::revalidation::PageCache;

mod cache_eviction;

#[rocket::async_trait]
trait Job: Send + Sync + Debug + 'static {
    fn period(&self) -> Duration;
    async fn execute(&mut self) -> anyhow::Result<()>;

    fn instance(self) -> JobInstance
    where
        Self: Sized,
    {
        JobInstance::new(self)
    }
}

#[derive(Debug)]
pub(crate) struct JobInstance {
    job: Box<dyn Job>,
    last_executed: Option<Instant>,
}

impl JobInstance {
    fn new<T: Job>(job: T) -> Self {
        Self {
            job: Box::new(job),
            last_executed: None,
        }
    }

    fn is_ready(&self, now: Instant) -> bool {
        match self.last_executed {
            Some(_) => self.next_execution() <= now,
            None => true,
        }
    }

    fn next_execution(&self) -> Instant {
        match self.last_executed {
            Some(last_executed) => last_executed + self.job.period(),
            None => Instant::now(),
        }
    }
}

pub async fn run(cache: Arc<PageCache>) -> anyhow::Result<()> {
    let mut jobs = vec![cache_eviction::job(cache)];

    loop {
        let now = Instant::now();
        for instance in jobs.iter_mut().filter(|i| i.is_ready(now)) {
            instance.job.execute().await?;
            instance.last_executed = Some(now);
        }

        let Some(next_job) = jobs.iter().map(|j| j.next_execution()).min() else {
            return Ok(());
        };
        tokio::time::sleep_until(next_job.into()).await;
    }
}
