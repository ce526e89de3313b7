// ── Bridge engine ──
//
// Synchronous composition of repository, mirror, discovery and
// publisher. One `Bridge` owns one mirror; the async service serializes
// every call behind a mutex, so nothing here needs interior locking.

use tracing::{debug, info, trace, warn};

use crate::command::{self, Command, Inbound};
use crate::discovery::{DeviceIdentity, DiscoveryBuilder};
use crate::error::CoreError;
use crate::model::{Entity, Fact, StatValue};
use crate::repository::PiholeRepository;
use crate::runner::CommandRunner;
use crate::store::{Observation, StateMirror};
use crate::topics::TopicLayout;
use crate::transport::Publisher;

/// Statistic mirrored from the blocking switch on every blocking read.
const STATUS_FACT_ID: &str = "PiHole_Status";

/// Counts from one reconciliation pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PollReport {
    /// Descriptors published.
    pub registered: usize,
    /// Values published.
    pub published: usize,
    pub unchanged: usize,
    /// Families whose read failed, plus publishes that failed.
    pub failures: usize,
}

impl PollReport {
    fn absorb(&mut self, other: Self) {
        self.registered += other.registered;
        self.published += other.published;
        self.unchanged += other.unchanged;
        self.failures += other.failures;
    }
}

/// What happened to one inbound message.
#[derive(Debug)]
pub enum Dispatch {
    /// Mutation succeeded; `published` values were re-sent.
    Applied { command: Command, published: usize },
    /// Mutation attempted and reported failure. Nothing was published.
    Failed { command: Command, error: CoreError },
    /// Payload not accepted. No mutation attempted.
    Rejected,
    /// Topic is not a command topic, or the group is not exposed.
    Ignored,
}

pub struct Bridge<R, P> {
    repo: PiholeRepository<R>,
    publisher: P,
    discovery: DiscoveryBuilder,
    topics: TopicLayout,
    mirror: StateMirror,
}

impl<R: CommandRunner, P: Publisher> Bridge<R, P> {
    pub fn new(
        repo: PiholeRepository<R>,
        publisher: P,
        identity: DeviceIdentity,
        topics: TopicLayout,
    ) -> Self {
        Self {
            repo,
            publisher,
            discovery: DiscoveryBuilder::new(identity, topics.clone()),
            topics,
            mirror: StateMirror::new(),
        }
    }

    pub fn mirror(&self) -> &StateMirror {
        &self.mirror
    }

    // ── Reconciliation ───────────────────────────────────────────────

    /// Forget everything and publish the full state again.
    ///
    /// Run on every broker connection: a new session is treated like a
    /// fresh start, never a resume.
    pub fn resync(&mut self) -> PollReport {
        self.mirror.clear();
        let report = self.poll();
        info!(
            registered = report.registered,
            published = report.published,
            "full sync complete"
        );
        report
    }

    /// Read every family, publish what is new or changed.
    ///
    /// A failing family is logged and skipped; the others still run.
    pub fn poll(&mut self) -> PollReport {
        let mut report = PollReport::default();

        match self.observe_groups() {
            Ok(groups) => report.absorb(self.reconcile(&groups)),
            Err(e) => {
                warn!(error = %e, "group poll failed");
                report.failures += 1;
            }
        }

        let status_known = match self.observe_blocking() {
            Ok(blocking) => {
                let known = !blocking.is_empty();
                report.absorb(self.reconcile(&blocking));
                known
            }
            Err(e) => {
                warn!(error = %e, "blocking status poll failed");
                report.failures += 1;
                false
            }
        };

        let mut stats = self.observe_statistics();
        if status_known {
            stats.retain(|e| e.key.id != STATUS_FACT_ID);
        }
        report.absorb(self.reconcile(&stats));

        debug!(
            registered = report.registered,
            published = report.published,
            unchanged = report.unchanged,
            failures = report.failures,
            "poll complete"
        );
        report
    }

    fn reconcile(&mut self, observed: &[Entity]) -> PollReport {
        let outcome = self.mirror.reconcile(observed);
        let mut report = PollReport {
            unchanged: outcome.unchanged.len(),
            ..PollReport::default()
        };

        for entity in &outcome.new {
            report.absorb(self.emit(entity, true));
        }
        for entity in &outcome.changed {
            report.absorb(self.emit(entity, false));
        }
        report
    }

    /// Publish descriptor (when new) then value. The mirror already
    /// holds `entity`'s value; failed publishes roll it back.
    fn emit(&mut self, entity: &Entity, is_new: bool) -> PollReport {
        let mut report = PollReport::default();

        if is_new {
            if let Err(e) = self.announce(entity) {
                warn!(key = %entity.key, error = %e, "discovery publish failed");
                self.mirror.forget(&entity.key);
                report.failures += 1;
                return report;
            }
            report.registered += 1;
        }

        let topic = self.topics.state_topic(&entity.key);
        match self.publisher.publish(&topic, &entity.value.payload()) {
            Ok(()) => {
                trace!(key = %entity.key, value = %entity.value, "state published");
                report.published += 1;
            }
            Err(e) => {
                warn!(key = %entity.key, error = %e, "state publish failed");
                self.mirror.mark_unpublished(&entity.key);
                report.failures += 1;
            }
        }
        report
    }

    fn announce(&self, entity: &Entity) -> Result<(), CoreError> {
        let announcement = self.discovery.announcement(entity)?;
        self.publisher
            .publish(&announcement.topic, &announcement.payload)?;
        debug!(key = %entity.key, topic = %announcement.topic, "entity registered");
        Ok(())
    }

    // ── Observation ──────────────────────────────────────────────────

    fn observe_groups(&self) -> Result<Vec<Entity>, CoreError> {
        let groups = self.repo.list_groups(&self.repo.store_config().group_filter)?;
        Ok(groups
            .into_iter()
            .map(|(name, enabled)| Entity::group(&name, enabled))
            .collect())
    }

    /// The blocking switch and its status statistic, or nothing when the
    /// state cannot be determined.
    fn observe_blocking(&self) -> Result<Vec<Entity>, CoreError> {
        let Some(enabled) = self.repo.blocking_status()? else {
            debug!("blocking state unknown");
            return Ok(Vec::new());
        };

        let status = Entity::from(Fact {
            id: STATUS_FACT_ID.to_owned(),
            label: "PiHole Status".to_owned(),
            value: StatValue::Text(if enabled { "Active" } else { "Offline" }.to_owned()),
            unit: None,
        });
        Ok(vec![Entity::blocking(enabled), status])
    }

    fn observe_statistics(&self) -> Vec<Entity> {
        self.repo
            .list_statistics()
            .into_iter()
            .map(Entity::from)
            .collect()
    }

    // ── Commands ─────────────────────────────────────────────────────

    /// Decode and apply one inbound message.
    pub fn handle_message(&mut self, topic: &str, payload: &[u8]) -> Dispatch {
        match command::decode(&self.topics, topic, payload) {
            Inbound::Ignored => {
                trace!(%topic, "ignoring message on foreign topic");
                Dispatch::Ignored
            }
            Inbound::Rejected { topic, payload } => {
                warn!(%topic, %payload, "unexpected payload, expected \"0\" or \"1\"");
                Dispatch::Rejected
            }
            Inbound::Command(command) => self.execute(command),
        }
    }

    /// Run a mutation and, on success, re-publish the affected entity.
    pub fn execute(&mut self, command: Command) -> Dispatch {
        let result = match &command {
            Command::SetGroup { name, enabled } => {
                if !self.is_exposed(name) {
                    warn!(group = %name, "command for a group outside the filter, ignoring");
                    return Dispatch::Ignored;
                }
                self.repo.set_group_enabled(name, *enabled)
            }
            Command::SetBlocking { enabled } => self.repo.set_blocking(*enabled),
        };

        if let Err(error) = result {
            warn!(?command, error = %error, "mutation failed");
            return Dispatch::Failed { command, error };
        }

        info!(?command, "mutation applied");
        let published = match self.refresh_target(&command) {
            Ok(report) => report.published,
            Err(e) => {
                warn!(?command, error = %e, "re-read after mutation failed");
                0
            }
        };
        Dispatch::Applied { command, published }
    }

    fn is_exposed(&self, group: &str) -> bool {
        group
            .to_lowercase()
            .contains(&self.repo.store_config().group_filter.to_lowercase())
    }

    /// Targeted, out-of-cycle sync of the entity a command touched.
    ///
    /// Publishes even when the value equals the mirror: the controller
    /// waits for this echo to confirm the switch.
    fn refresh_target(&mut self, command: &Command) -> Result<PollReport, CoreError> {
        let observed = match command {
            Command::SetGroup { name, .. } => self
                .observe_groups()?
                .into_iter()
                .filter(|e| e.key.id == *name)
                .collect(),
            Command::SetBlocking { .. } => self.observe_blocking()?,
        };

        if observed.is_empty() {
            debug!(?command, "entity not visible after mutation");
        }

        let mut report = PollReport::default();
        for entity in &observed {
            let is_new = self.mirror.observe(entity) == Observation::New;
            report.absorb(self.emit(entity, is_new));
        }
        Ok(report)
    }
}
