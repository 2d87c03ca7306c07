//! End-to-end `collect` pipeline: challenge code → channel → messages →
//! submissions → clones / prod checks → delivery report.
//!
//! Messages are processed one at a time, oldest first. A failure while
//! handling one message is captured in its [`MessageOutcome`] and never stops
//! the run; only locating the channel and fetching its messages are fatal.

use std::time::{Duration, Instant};

use tracing::{info, instrument, warn};

use deliverybot_chat::{ChatMessage, ChatSource};
use deliverybot_checker::{ProdCheck, ProdChecker};
use deliverybot_shared::{ChallengeCode, DeliveryBotError, ParsedLine, Result};
use deliverybot_storage::{ChallengeRecord, ProjectRecord, Storage};

use crate::classifier::classify_message;
use crate::extractor::extract_submission;
use crate::locator::{self, ChannelLocation};
use crate::materializer::{MaterializeOutcome, RepoMaterializer};
use crate::roster::Roster;
use crate::tracker::{Attribution, DeliveryTracker};

/// Configuration for the `collect_deliveries` pipeline.
#[derive(Debug, Clone)]
pub struct CollectConfig {
    /// Challenge whose channel is read.
    pub challenge: ChallengeCode,
    /// Run prod URLs through the HTML validator.
    pub validate: bool,
    /// Maximum number of channel messages to read.
    pub message_limit: usize,
    /// Display name of the bot that relays submissions.
    pub forwarder_name: String,
}

/// Collaborators the pipeline drives.
pub struct CollectDeps<'a, S: ChatSource> {
    pub source: &'a S,
    pub materializer: &'a RepoMaterializer,
    pub checker: &'a ProdChecker,
    /// Persistence is skipped when `None`.
    pub storage: Option<&'a Storage>,
}

/// A processed, non-duplicate submission.
#[derive(Debug, Clone)]
pub struct Delivery {
    pub attribution: Attribution,
    /// `(url, folder, outcome)` per repo line.
    pub repos: Vec<(String, String, MaterializeOutcome)>,
    pub prod_checks: Vec<ProdCheck>,
}

/// What happened to one chat message.
#[derive(Debug)]
pub enum MessageOutcome {
    Delivered(Delivery),
    Duplicate {
        nickname: String,
    },
    Failed {
        message_id: String,
        /// Known once the author was resolved.
        nickname: Option<String>,
        error: DeliveryBotError,
    },
}

/// Result of the `collect_deliveries` pipeline.
#[derive(Debug)]
pub struct DeliveryReport {
    pub challenge: ChallengeCode,
    pub location: ChannelLocation,
    /// One entry per message, in processing order.
    pub outcomes: Vec<MessageOutcome>,
    /// Roster students credited with a delivery.
    pub delivered: usize,
    pub roster_size: usize,
    /// Roster students without a delivery, in roster order.
    pub missing: Vec<String>,
    /// Delivering identifiers that are not on the roster.
    pub unlisted: Vec<String>,
    pub elapsed: Duration,
}

impl DeliveryReport {
    pub fn failures(&self) -> impl Iterator<Item = &MessageOutcome> {
        self.outcomes
            .iter()
            .filter(|o| matches!(o, MessageOutcome::Failed { .. }))
    }

    pub fn duplicates(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|o| matches!(o, MessageOutcome::Duplicate { .. }))
            .count()
    }
}

/// Progress callback for reporting pipeline status.
pub trait ProgressReporter: Send + Sync {
    /// Called when entering a new phase.
    fn phase(&self, name: &str);
    /// Called after each message has been handled.
    fn message_processed(&self, current: usize, total: usize, outcome: &MessageOutcome);
    /// Called when the pipeline completes.
    fn done(&self, report: &DeliveryReport);
}

/// No-op progress reporter for headless/test usage.
pub struct SilentProgress;

impl ProgressReporter for SilentProgress {
    fn phase(&self, _name: &str) {}
    fn message_processed(&self, _current: usize, _total: usize, _outcome: &MessageOutcome) {}
    fn done(&self, _report: &DeliveryReport) {}
}

/// Per-run context shared by every message.
struct RunContext<'a> {
    config: &'a CollectConfig,
    location: &'a ChannelLocation,
    challenge: Option<ChallengeRecord>,
}

/// Run the full `collect` pipeline.
///
/// 1. Locate the challenge channel
/// 2. Fetch its messages
/// 3. Fold each message into the tracker, cloning repos and checking prod URLs
/// 4. Report delivered vs roster
#[instrument(skip_all, fields(challenge = %config.challenge))]
pub async fn collect_deliveries<S: ChatSource>(
    config: &CollectConfig,
    deps: &CollectDeps<'_, S>,
    roster: Roster,
    progress: &dyn ProgressReporter,
) -> Result<DeliveryReport> {
    let start = Instant::now();

    // --- Phase 1: Channel ---
    progress.phase("Locating challenge channel");
    let location = locator::locate(deps.source, &config.challenge).await?;

    // --- Phase 2: Messages ---
    progress.phase("Fetching messages");
    let mut messages = deps
        .source
        .fetch_messages(&location.channel.id, config.message_limit)
        .await?;
    messages.sort_by(|a, b| a.timestamp.cmp(&b.timestamp).then_with(|| a.id.cmp(&b.id)));
    info!(count = messages.len(), "fetched submissions");

    let challenge = match deps.storage {
        Some(storage) => Some(
            storage
                .upsert_challenge(
                    &config.challenge.to_string(),
                    config.challenge.week,
                    &config.challenge.slot.to_string(),
                )
                .await?,
        ),
        None => None,
    };

    // --- Phase 3: Fold ---
    progress.phase("Processing submissions");
    let ctx = RunContext {
        config,
        location: &location,
        challenge,
    };
    let mut tracker = DeliveryTracker::new(roster);
    let mut outcomes = Vec::with_capacity(messages.len());
    let total = messages.len();

    for (i, message) in messages.iter().enumerate() {
        let outcome = process_message(&ctx, deps, &mut tracker, message).await;
        if let MessageOutcome::Failed { error, nickname, .. } = &outcome {
            warn!(
                message_id = %message.id,
                nickname = nickname.as_deref().unwrap_or("?"),
                error = %error,
                "failed to process message"
            );
        }
        progress.message_processed(i + 1, total, &outcome);
        outcomes.push(outcome);
    }

    // --- Phase 4: Report ---
    let report = DeliveryReport {
        challenge: config.challenge,
        location,
        outcomes,
        delivered: tracker.delivered_count(),
        roster_size: tracker.roster().len(),
        missing: tracker.missing(),
        unlisted: tracker.unlisted().to_vec(),
        elapsed: start.elapsed(),
    };

    progress.done(&report);

    info!(
        delivered = report.delivered,
        roster = report.roster_size,
        missing = report.missing.len(),
        duplicates = report.duplicates(),
        failures = report.failures().count(),
        elapsed_ms = report.elapsed.as_millis(),
        "collect pipeline complete"
    );

    Ok(report)
}

/// Handle one message, capturing any error in the outcome.
async fn process_message<S: ChatSource>(
    ctx: &RunContext<'_>,
    deps: &CollectDeps<'_, S>,
    tracker: &mut DeliveryTracker,
    message: &ChatMessage,
) -> MessageOutcome {
    let submission =
        match extract_submission(deps.source, message, &ctx.config.forwarder_name).await {
            Ok(s) => s,
            Err(error) => {
                return MessageOutcome::Failed {
                    message_id: message.id.clone(),
                    nickname: None,
                    error,
                };
            }
        };

    info!(nickname = %submission.nickname, "parsing submission");
    let lines = classify_message(&submission.raw_text);

    let Some(attribution) = tracker.record(&submission, &lines) else {
        return MessageOutcome::Duplicate {
            nickname: submission.nickname,
        };
    };

    match deliver(ctx, deps, attribution, &lines).await {
        Ok(delivery) => MessageOutcome::Delivered(delivery),
        Err(error) => MessageOutcome::Failed {
            message_id: message.id.clone(),
            nickname: Some(submission.nickname),
            error,
        },
    }
}

/// Clone repos, check prod URLs and persist the project for one submission.
async fn deliver<S: ChatSource>(
    ctx: &RunContext<'_>,
    deps: &CollectDeps<'_, S>,
    attribution: Attribution,
    lines: &[ParsedLine],
) -> Result<Delivery> {
    let mut repos = Vec::new();
    let mut prod_checks = Vec::new();

    for line in lines {
        match line {
            ParsedLine::Repo { side, url } => {
                let folder = format!("{}{}", attribution.folder, side.folder_suffix());
                let outcome = deps.materializer.materialize(
                    url,
                    &ctx.location.channel.name,
                    &ctx.location.category.name,
                    &folder,
                )?;
                repos.push((url.clone(), folder, outcome));
            }
            ParsedLine::Prod { url, .. } => {
                let check = match deps.checker.check(url, ctx.config.validate).await {
                    Ok(check) => check,
                    Err(e) => {
                        warn!(url = %url, error = %e, "skipping prod check");
                        ProdCheck::unreachable(url, e.to_string())
                    }
                };
                prod_checks.push(check);
            }
            ParsedLine::Group { .. } | ParsedLine::Other => {}
        }
    }

    if let (Some(storage), Some(challenge)) = (deps.storage, &ctx.challenge) {
        let project = ProjectRecord {
            name: attribution.folder.clone(),
            student: attribution.submitter.clone(),
            repo_urls: repos.iter().map(|(url, _, _)| url.clone()).collect(),
            prod_urls: prod_checks.iter().map(|c| c.url.clone()).collect(),
        };
        storage.upsert_project(&challenge.id, &project).await?;
    }

    Ok(Delivery {
        attribution,
        repos,
        prod_checks,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::path::PathBuf;

    use chrono::{TimeZone, Utc};
    use deliverybot_chat::{Author, CATEGORY_KIND, Channel, Member};
    use deliverybot_shared::CheckerConfig;

    /// In-memory guild: channels, messages and members.
    struct FakeGuild {
        channels: Vec<Channel>,
        messages: Vec<ChatMessage>,
        members: HashMap<String, Member>,
    }

    impl ChatSource for FakeGuild {
        async fn list_channels(&self) -> Result<Vec<Channel>> {
            Ok(self.channels.clone())
        }

        async fn fetch_messages(&self, channel_id: &str, limit: usize) -> Result<Vec<ChatMessage>> {
            assert_eq!(channel_id, "21");
            Ok(self.messages.iter().take(limit).cloned().collect())
        }

        async fn fetch_member(&self, user_id: &str) -> Result<Member> {
            self.members
                .get(user_id)
                .cloned()
                .ok_or_else(|| DeliveryBotError::lookup(format!("member {user_id}")))
        }
    }

    fn guild(posts: &[(&str, &str, i64)], members: &[(&str, Option<&str>, &str)]) -> FakeGuild {
        let channels = vec![
            Channel {
                id: "2".into(),
                name: "Week 2".into(),
                kind: CATEGORY_KIND,
                parent_id: None,
            },
            Channel {
                id: "21".into(),
                name: "challenge-1".into(),
                kind: 0,
                parent_id: Some("2".into()),
            },
        ];

        // Newest first, like the chat API.
        let messages = posts
            .iter()
            .enumerate()
            .rev()
            .map(|(i, (user_id, content, minute))| ChatMessage {
                id: format!("m{i}"),
                content: content.to_string(),
                author: Author {
                    id: user_id.to_string(),
                    username: user_id.to_string(),
                },
                timestamp: Utc.with_ymd_and_hms(2026, 10, 5, 9, *minute as u32, 0).unwrap(),
            })
            .collect();

        let members = members
            .iter()
            .map(|(id, nick, username)| {
                (
                    id.to_string(),
                    Member {
                        nick: nick.map(String::from),
                        user: Author {
                            id: id.to_string(),
                            username: username.to_string(),
                        },
                    },
                )
            })
            .collect();

        FakeGuild {
            channels,
            messages,
            members,
        }
    }

    fn config() -> CollectConfig {
        CollectConfig {
            challenge: "w2ch1".parse().unwrap(),
            validate: false,
            message_limit: 100,
            forwarder_name: "Delivery Cat".into(),
        }
    }

    fn temp_root() -> PathBuf {
        let dir = std::env::temp_dir().join(format!("db_pipe_test_{}", uuid::Uuid::now_v7()));
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    fn checker() -> ProdChecker {
        ProdChecker::new(&CheckerConfig {
            validator_url: "http://127.0.0.1:9/unused".into(),
            timeout_secs: 5,
        })
        .unwrap()
    }

    /// Pre-create clone destinations so no git process is spawned.
    fn precreate(m: &RepoMaterializer, folders: &[&str]) {
        let dir = m.delivery_dir("Week 2", "challenge-1");
        for f in folders {
            std::fs::create_dir_all(dir.join(f)).unwrap();
        }
    }

    #[tokio::test]
    async fn full_run_tracks_groups_duplicates_and_missing() {
        let source = guild(
            &[
                ("u1", "De grupo: Ana - Luis\nRepo: https://github.com/ana/w2ch1", 1),
                ("u3", "Repo: https://github.com/marta/w2ch1", 2),
                ("u3", "Repo: https://github.com/marta/w2ch1-v2", 3),
                ("u2", "Repo: https://github.com/luis/w2ch1", 4),
            ],
            &[
                ("u1", Some("Ana"), "ana_g"),
                ("u2", None, "Luis"),
                ("u3", Some("Marta Ruíz"), "mr"),
            ],
        );
        let materializer = RepoMaterializer::new(temp_root(), "/nonexistent/git-binary");
        precreate(&materializer, &["ana-luis", "marta-ruiz"]);
        let checker = checker();
        let deps = CollectDeps {
            source: &source,
            materializer: &materializer,
            checker: &checker,
            storage: None,
        };
        let roster = Roster::new(["Ana", "Luis", "Marta Ruíz", "Pau", "Zoe"]);

        let report = collect_deliveries(&config(), &deps, roster, &SilentProgress)
            .await
            .expect("collect");

        assert_eq!(report.location.channel.id, "21");
        assert_eq!(report.outcomes.len(), 4);
        assert_eq!(report.delivered, 3);
        assert_eq!(report.roster_size, 5);
        assert_eq!(report.missing, ["pau", "zoe"]);
        assert_eq!(report.duplicates(), 2);
        assert_eq!(report.failures().count(), 0);

        match &report.outcomes[0] {
            MessageOutcome::Delivered(d) => {
                assert_eq!(d.attribution.folder, "ana-luis");
                assert_eq!(d.repos[0].2, MaterializeOutcome::Skipped);
            }
            other => panic!("expected delivery, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn failing_message_does_not_stop_the_run() {
        let source = guild(
            &[
                ("ghost", "Repo: https://github.com/x/y", 1),
                ("u1", "Repo: https://github.com/ana/new", 2),
                ("u2", "Repo: https://github.com/luis/w2ch1", 3),
            ],
            &[("u1", Some("Ana"), "ana_g"), ("u2", None, "luis")],
        );
        let materializer = RepoMaterializer::new(temp_root(), "/nonexistent/git-binary");
        precreate(&materializer, &["luis"]);
        let checker = checker();
        let deps = CollectDeps {
            source: &source,
            materializer: &materializer,
            checker: &checker,
            storage: None,
        };

        let report = collect_deliveries(&config(), &deps, Roster::new(["ana", "luis"]), &SilentProgress)
            .await
            .expect("collect");

        assert_eq!(report.failures().count(), 2);
        assert!(matches!(
            &report.outcomes[0],
            MessageOutcome::Failed { nickname: None, error, .. } if error.is_lookup()
        ));
        assert!(matches!(
            &report.outcomes[1],
            MessageOutcome::Failed { nickname: Some(n), error: DeliveryBotError::Clone { .. }, .. } if n == "ana"
        ));
        assert!(matches!(report.outcomes[2], MessageOutcome::Delivered(_)));
        // Ana posted, so she counts even though her clone failed.
        assert!(report.missing.is_empty());
    }

    #[tokio::test]
    async fn missing_channel_aborts_run() {
        let mut source = guild(&[], &[]);
        source.channels.pop();
        let materializer = RepoMaterializer::new(temp_root(), "git");
        let checker = checker();
        let deps = CollectDeps {
            source: &source,
            materializer: &materializer,
            checker: &checker,
            storage: None,
        };

        let err = collect_deliveries(&config(), &deps, Roster::default(), &SilentProgress)
            .await
            .unwrap_err();
        assert!(err.is_lookup());
    }

    #[tokio::test]
    async fn unreachable_prod_does_not_block_later_repo_lines() {
        let source = guild(
            &[(
                "u1",
                "Prod: http://127.0.0.1:9/\nRepo: https://github.com/ana/w2ch1",
                1,
            )],
            &[("u1", Some("Ana"), "ana_g")],
        );
        let materializer = RepoMaterializer::new(temp_root(), "/nonexistent/git-binary");
        precreate(&materializer, &["ana"]);
        let checker = checker();
        let deps = CollectDeps {
            source: &source,
            materializer: &materializer,
            checker: &checker,
            storage: None,
        };

        let report = collect_deliveries(&config(), &deps, Roster::new(["ana"]), &SilentProgress)
            .await
            .expect("collect");

        let MessageOutcome::Delivered(delivery) = &report.outcomes[0] else {
            panic!("expected delivery, got {:?}", report.outcomes[0]);
        };
        assert!(matches!(
            delivery.prod_checks[0].status,
            deliverybot_checker::ProdStatus::Unreachable(_)
        ));
        assert_eq!(delivery.repos.len(), 1);
        assert_eq!(delivery.repos[0].1, "ana");
        assert_eq!(delivery.repos[0].2, MaterializeOutcome::Skipped);
    }

    #[tokio::test]
    async fn prod_checks_and_persistence() {
        let server = wiremock::MockServer::start().await;
        wiremock::Mock::given(wiremock::matchers::method("GET"))
            .and(wiremock::matchers::path("/"))
            .respond_with(wiremock::ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let prod = format!("{}/", server.uri());
        let body = format!(
            "Front - repo: https://github.com/pau/front\nBack - repo: https://github.com/pau/back\nProd: {prod}"
        );
        let source = guild(&[("u1", body.as_str(), 1)], &[("u1", Some("Pau"), "pau")]);
        let materializer = RepoMaterializer::new(temp_root(), "/nonexistent/git-binary");
        precreate(&materializer, &["pau-front", "pau-back"]);
        let checker = checker();

        let db_path = std::env::temp_dir().join(format!("db_pipe_{}.db", uuid::Uuid::now_v7()));
        let storage = Storage::open(&db_path).await.unwrap();
        let deps = CollectDeps {
            source: &source,
            materializer: &materializer,
            checker: &checker,
            storage: Some(&storage),
        };

        let report = collect_deliveries(&config(), &deps, Roster::new(["pau"]), &SilentProgress)
            .await
            .expect("collect");

        let MessageOutcome::Delivered(delivery) = &report.outcomes[0] else {
            panic!("expected delivery, got {:?}", report.outcomes[0]);
        };
        let folders: Vec<&str> = delivery.repos.iter().map(|(_, f, _)| f.as_str()).collect();
        assert_eq!(folders, ["pau-front", "pau-back"]);
        assert_eq!(
            delivery.prod_checks[0].status,
            deliverybot_checker::ProdStatus::NotFound
        );

        let challenge = storage.get_challenge("w2ch1").await.unwrap().expect("challenge stored");
        assert_eq!(challenge.number, "1");
        let projects = storage.list_projects_by_challenge(&challenge.id).await.unwrap();
        assert_eq!(projects.len(), 1);
        assert_eq!(projects[0].name, "pau");
        assert_eq!(projects[0].repo_urls.len(), 2);
        assert_eq!(projects[0].prod_urls, vec![prod]);
    }
}
