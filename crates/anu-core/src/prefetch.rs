use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};

use futures::future::try_join_all;
use tokio::sync::Semaphore;
use uuid::Uuid;

use crate::cache::CacheWriter;
use crate::config::PrefetchConfig;
use crate::error::AppError;
use crate::job::{PrefetchEvent, PrefetchJob, PrefetchReporter, Stage};
use crate::models::{ContentNode, Course, ResourceLocator};
use crate::traits::{CacheStore, Fetcher, ResourceExtractor};

/// Locators enumerated from a course before any network access.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrefetchPlan {
    /// Home, listing, course and module pages and images, fetched first.
    pub structure: Vec<ResourceLocator>,
    /// Lesson and assessment pages, fetched second and scanned for images.
    pub pages: Vec<ResourceLocator>,
}

impl PrefetchPlan {
    pub fn from_course(course: &Course, config: &PrefetchConfig) -> Self {
        let mut structure = vec![
            config.home_locator(),
            config.listing_locator(),
            config.localize(course.path()),
        ];
        structure.extend(course.image_locator());

        let mut pages = Vec::new();
        for module in &course.modules {
            structure.push(config.localize(module.path()));
            structure.extend(module.image_locator());

            pages.extend(module.lessons.iter().map(|l| config.localize(l.path())));
            if let Some(assessment) = module.present_assessment() {
                pages.push(config.localize(assessment.path()));
            }
        }

        Self { structure, pages }
    }

    pub fn total(&self) -> usize {
        self.structure.len() + self.pages.len()
    }
}

/// Summary of a successful prefetch run.
#[derive(Debug, Clone)]
pub struct PrefetchReport {
    pub job_id: Uuid,
    pub structure: usize,
    pub pages: usize,
    pub images: usize,
    /// Every locator written, in issue order. Duplicates are kept.
    pub stored: Vec<ResourceLocator>,
    pub elapsed: Duration,
}

/// Makes a course available offline by populating the durable cache.
///
/// Runs two stages, each a concurrent batch: first the structural pages
/// and images, then the lesson and assessment pages, whose payloads reveal
/// the images to fetch last. The first failure in a batch fails the run;
/// siblings already issued keep running and their writes stay in the cache.
pub struct PrefetchService<F, X, S>
where
    F: Fetcher,
    X: ResourceExtractor,
    S: CacheStore,
{
    fetcher: F,
    extractor: X,
    store: S,
    config: PrefetchConfig,
}

impl<F, X, S> PrefetchService<F, X, S>
where
    F: Fetcher,
    X: ResourceExtractor,
    S: CacheStore,
{
    pub fn new(fetcher: F, extractor: X, store: S, config: PrefetchConfig) -> Self {
        Self {
            fetcher,
            extractor,
            store,
            config,
        }
    }

    pub fn config(&self) -> &PrefetchConfig {
        &self.config
    }

    /// Run a prefetch for `course`, publishing state transitions on `job`.
    ///
    /// Any error is logged once through `reporter` and recorded as the
    /// job's `Failed` state before being returned.
    pub async fn prefetch<R: PrefetchReporter>(
        &self,
        course: &Course,
        job: &PrefetchJob,
        reporter: &R,
    ) -> Result<PrefetchReport, AppError> {
        let job_id = job.start();
        reporter.report(PrefetchEvent::Started {
            job_id,
            course_path: &course.path,
            cache_name: &self.config.cache_name,
        });

        let result = self.run(job_id, course, reporter).await;

        match &result {
            Ok(report) => reporter.report(PrefetchEvent::Succeeded {
                job_id,
                stored: report.stored.len(),
                elapsed: report.elapsed,
            }),
            Err(error) => reporter.report(PrefetchEvent::Failed { job_id, error }),
        }
        job.finish(job_id, &result);
        result
    }

    async fn run<R: PrefetchReporter>(
        &self,
        job_id: Uuid,
        course: &Course,
        reporter: &R,
    ) -> Result<PrefetchReport, AppError> {
        let started = Instant::now();
        self.config.validate()?;

        // The cache name is resolved once per run.
        let cache = self.store.open(&self.config.cache_name).await?;
        let writer = CacheWriter::new(self.fetcher.clone(), cache);
        let plan = PrefetchPlan::from_course(course, &self.config);
        let mut stored = Vec::with_capacity(plan.total());

        // Stage A: structural pages and images.
        let structure = self
            .batch(Stage::Structure, plan.structure, reporter, |locator| {
                let writer = writer.clone();
                async move {
                    writer.fetch_and_store(&locator).await?;
                    Ok::<_, AppError>(locator)
                }
            })
            .await?;
        report_stored(reporter, Stage::Structure, &structure);
        let structure_count = structure.len();
        stored.extend(structure);

        // Stage B: lesson and assessment pages, scanned for images.
        let pages = self
            .batch(Stage::Pages, plan.pages, reporter, |locator| {
                let writer = writer.clone();
                let extractor = self.extractor.clone();
                async move {
                    let response = writer.fetch_and_store(&locator).await?;
                    let images = extractor.extract_image_locators(&response.into_text())?;
                    Ok::<_, AppError>((locator, images))
                }
            })
            .await?;
        let page_count = pages.len();

        let mut discovered = Vec::new();
        for (page, images) in pages {
            reporter.report(PrefetchEvent::ResourceStored {
                stage: Stage::Pages,
                locator: &page,
            });
            reporter.report(PrefetchEvent::ImagesDiscovered {
                page: &page,
                count: images.len(),
            });
            discovered.extend(images);
            stored.push(page);
        }

        let images = self
            .batch(Stage::Images, discovered, reporter, |locator| {
                let writer = writer.clone();
                async move {
                    writer.fetch_and_store(&locator).await?;
                    Ok::<_, AppError>(locator)
                }
            })
            .await?;
        report_stored(reporter, Stage::Images, &images);
        let image_count = images.len();
        stored.extend(images);

        Ok(PrefetchReport {
            job_id,
            structure: structure_count,
            pages: page_count,
            images: image_count,
            stored,
            elapsed: started.elapsed(),
        })
    }

    /// Issue one task per locator, in order, and wait for all of them.
    ///
    /// Returns on the first error. Remaining tasks are detached, not
    /// aborted. Results come back in issue order.
    async fn batch<T, R, Op, Fut>(
        &self,
        stage: Stage,
        locators: Vec<ResourceLocator>,
        reporter: &R,
        op: Op,
    ) -> Result<Vec<T>, AppError>
    where
        T: Send + 'static,
        R: PrefetchReporter,
        Op: Fn(ResourceLocator) -> Fut,
        Fut: Future<Output = Result<T, AppError>> + Send + 'static,
    {
        let size = locators.len();
        reporter.report(PrefetchEvent::BatchStarted { stage, size });

        let limiter = self
            .config
            .max_concurrency
            .map(|limit| Arc::new(Semaphore::new(limit)));

        let handles: Vec<_> = locators
            .into_iter()
            .map(|locator| {
                let task = op(locator);
                let limiter = limiter.clone();
                tokio::spawn(async move {
                    let _permit = match limiter {
                        Some(semaphore) => match semaphore.acquire_owned().await {
                            Ok(permit) => Some(permit),
                            Err(e) => return Err(AppError::TaskError(e.to_string())),
                        },
                        None => None,
                    };
                    task.await
                })
            })
            .collect();

        let results = try_join_all(handles.into_iter().map(|handle| async move {
            match handle.await {
                Ok(result) => result,
                Err(e) => Err(AppError::TaskError(format!("fetch task failed: {e}"))),
            }
        }))
        .await?;

        reporter.report(PrefetchEvent::BatchCompleted { stage, size });
        Ok(results)
    }
}

fn report_stored<R: PrefetchReporter>(reporter: &R, stage: Stage, locators: &[ResourceLocator]) {
    for locator in locators {
        reporter.report(PrefetchEvent::ResourceStored { stage, locator });
    }
}
