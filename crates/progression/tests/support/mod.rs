//! In-memory collaborators for orchestrator tests.
//!
//! `MemoryStore` implements every capability trait. `begin` snapshots the
//! committed [`World`] into a [`MemoryTx`]; commit swaps it back in, rollback
//! and drop discard it, so partial effects of a failed ingestion are observable.

#![allow(dead_code)]

use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use chrono::{DateTime, Duration, NaiveDate, TimeZone, Utc};
use lingo_xp_core::{
    week_start_of, AchievementRepository, ActionCounters, EventType, EventTypeRepository,
    InternalCurrencyRepository, LevelHistoryEntry, LevelProgress, LevelRepository, MessageBus,
    NewNotification, Notification, NotificationRepository, PresenceCache, ProgressionError,
    UnitOfWork, UnlockedAchievement, UserRepository, UserStats, UserStatsRepository, XpEvent,
    XpEventRepository,
};
use lingo_xp_progression::EventIngestionOrchestrator;
use parking_lot::Mutex;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

pub const USER: i64 = 42;
pub const MINI_GAME: &str = "mini_game_completed";
pub const QUIZ_BONUS: &str = "quiz_bonus";
pub const RETIRED: &str = "retired_event";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Achievement {
    pub id: i32,
    pub name: String,
    pub metric: &'static str,
    pub threshold: i64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CurrencyTransaction {
    pub telegram_id: i64,
    pub event_type_id: i32,
    pub amount: Decimal,
    pub balance_after: Decimal,
    pub description: String,
}

/// Everything the fakes persist.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct World {
    pub now: Option<DateTime<Utc>>,
    pub users: BTreeSet<i64>,
    pub stats: BTreeMap<i64, UserStats>,
    pub event_types: Vec<EventType>,
    pub xp_events: Vec<XpEvent>,
    /// `(level_number, xp_required)`
    pub levels: Vec<(i32, i64)>,
    pub level_history: Vec<LevelHistoryEntry>,
    pub balances: BTreeMap<i64, Decimal>,
    pub currency_transactions: Vec<CurrencyTransaction>,
    pub achievements: Vec<Achievement>,
    pub user_achievements: BTreeSet<(i64, i32)>,
    pub notifications: Vec<Notification>,
}

impl World {
    pub fn seeded() -> Self {
        let now = Utc.with_ymd_and_hms(2026, 10, 21, 12, 0, 0).unwrap();
        let mut world = Self {
            now: Some(now),
            levels: vec![(1, 0), (2, 100), (3, 250)],
            event_types: vec![
                event_type(1, MINI_GAME, 40, None, true),
                event_type(2, QUIZ_BONUS, 70, Some(dec!(5.00)), true),
                event_type(3, RETIRED, 10, None, false),
            ],
            achievements: vec![
                achievement(1, "first_xp", "xp_total", 1),
                achievement(2, "century", "xp_total", 100),
                achievement(3, "bookworm", "words_learned", 50),
            ],
            ..Self::default()
        };
        world.add_user(USER);
        world
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.now.unwrap_or_else(Utc::now)
    }

    pub fn today(&self) -> NaiveDate {
        self.now().date_naive()
    }

    pub fn add_user(&mut self, telegram_id: i64) {
        self.users.insert(telegram_id);
        self.stats.insert(telegram_id, empty_stats(telegram_id));
        self.level_history.push(LevelHistoryEntry {
            telegram_id,
            level_number: 1,
            xp_at_reach: 0,
            xp_event_id: None,
            reached_at: self.now(),
        });
    }

    /// Appends a ledger row directly, as if ingested earlier.
    pub fn seed_xp(&mut self, telegram_id: i64, delta_xp: i64) {
        let id = self.next_event_id();
        let now = self.now();
        self.xp_events.push(XpEvent {
            id,
            event_type_id: 1,
            telegram_id,
            delta_xp,
            occurred_at: now,
            inserted_at: now,
            week_start: week_start_of(now),
        });
    }

    pub fn xp_total(&self, telegram_id: i64) -> i64 {
        self.xp_events
            .iter()
            .filter(|e| e.telegram_id == telegram_id)
            .map(|e| e.delta_xp)
            .sum()
    }

    pub fn history_levels(&self, telegram_id: i64) -> Vec<i32> {
        self.level_history
            .iter()
            .filter(|h| h.telegram_id == telegram_id)
            .map(|h| h.level_number)
            .collect()
    }

    fn next_event_id(&self) -> i64 {
        self.xp_events.last().map_or(1, |e| e.id + 1)
    }

    fn level_for(&self, xp: i64) -> i32 {
        self.levels
            .iter()
            .filter(|(_, required)| *required <= xp)
            .map(|(level, _)| *level)
            .max()
            .unwrap_or(1)
    }

    fn stats_mut(&mut self, telegram_id: i64) -> Result<&mut UserStats, ProgressionError> {
        self.stats
            .get_mut(&telegram_id)
            .ok_or(ProgressionError::UserStatsNotFound(telegram_id))
    }
}

pub fn event_type(
    id: i32,
    name: &str,
    xp_delta: i64,
    reward_amount: Option<Decimal>,
    enabled: bool,
) -> EventType {
    EventType {
        id,
        name: name.to_string(),
        xp_delta,
        reward_amount,
        description: None,
        enabled,
    }
}

fn achievement(id: i32, name: &str, metric: &'static str, threshold: i64) -> Achievement {
    Achievement {
        id,
        name: name.to_string(),
        metric,
        threshold,
    }
}

pub fn empty_stats(telegram_id: i64) -> UserStats {
    UserStats {
        telegram_id,
        streak_days: 0,
        longest_streak: 0,
        last_streak_date: None,
        words_learned: 0,
        tasks_completed: 0,
        mini_games_played: 0,
        xp_total: 0,
        level: 1,
        last_active_at: None,
    }
}

/// Collaborator call that can be made to fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailPoint {
    UserExists,
    StatsExists,
    EventTypeExists,
    EventTypeGet,
    XpCreate,
    StatsSync,
    LevelBackfill,
    CurrencyAdd,
    StreakCheck,
    StreakIncrement,
    AchievementUnlock,
    NotificationCreate,
}

impl FailPoint {
    pub const ALL: [Self; 12] = [
        Self::UserExists,
        Self::StatsExists,
        Self::EventTypeExists,
        Self::EventTypeGet,
        Self::XpCreate,
        Self::StatsSync,
        Self::LevelBackfill,
        Self::CurrencyAdd,
        Self::StreakCheck,
        Self::StreakIncrement,
        Self::AchievementUnlock,
        Self::NotificationCreate,
    ];
}

pub struct MemoryTx {
    world: World,
}

#[derive(Default)]
struct StoreInner {
    committed: Mutex<World>,
    fail_at: Mutex<Option<FailPoint>>,
    begins: AtomicUsize,
    commits: AtomicUsize,
    rollbacks: AtomicUsize,
}

#[derive(Clone, Default)]
pub struct MemoryStore {
    inner: Arc<StoreInner>,
}

impl MemoryStore {
    pub fn new(world: World) -> Self {
        let store = Self::default();
        *store.inner.committed.lock() = world;
        store
    }

    pub fn snapshot(&self) -> World {
        self.inner.committed.lock().clone()
    }

    pub fn update(&self, f: impl FnOnce(&mut World)) {
        let mut world = self.inner.committed.lock();
        f(&mut *world);
    }

    pub fn fail_at(&self, point: FailPoint) {
        *self.inner.fail_at.lock() = Some(point);
    }

    pub fn begins(&self) -> usize {
        self.inner.begins.load(Ordering::SeqCst)
    }

    pub fn commits(&self) -> usize {
        self.inner.commits.load(Ordering::SeqCst)
    }

    pub fn rollbacks(&self) -> usize {
        self.inner.rollbacks.load(Ordering::SeqCst)
    }

    fn check(&self, point: FailPoint) -> Result<(), ProgressionError> {
        if *self.inner.fail_at.lock() == Some(point) {
            return Err(ProgressionError::Infrastructure(format!(
                "injected failure at {point:?}"
            )));
        }
        Ok(())
    }
}

#[async_trait]
impl UnitOfWork for MemoryStore {
    type Tx = MemoryTx;

    async fn begin(&self) -> Result<MemoryTx, ProgressionError> {
        self.inner.begins.fetch_add(1, Ordering::SeqCst);
        Ok(MemoryTx {
            world: self.snapshot(),
        })
    }

    async fn commit(&self, tx: MemoryTx) -> Result<(), ProgressionError> {
        self.inner.commits.fetch_add(1, Ordering::SeqCst);
        *self.inner.committed.lock() = tx.world;
        Ok(())
    }

    async fn rollback(&self, _tx: MemoryTx) -> Result<(), ProgressionError> {
        self.inner.rollbacks.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

#[async_trait]
impl UserRepository<MemoryTx> for MemoryStore {
    async fn exists_by_telegram_id(
        &self,
        tx: &mut MemoryTx,
        telegram_id: i64,
    ) -> Result<bool, ProgressionError> {
        self.check(FailPoint::UserExists)?;
        Ok(tx.world.users.contains(&telegram_id))
    }
}

#[async_trait]
impl UserStatsRepository<MemoryTx> for MemoryStore {
    async fn exists_by_telegram_id(
        &self,
        tx: &mut MemoryTx,
        telegram_id: i64,
    ) -> Result<bool, ProgressionError> {
        self.check(FailPoint::StatsExists)?;
        Ok(tx.world.stats.contains_key(&telegram_id))
    }

    async fn sync(
        &self,
        tx: &mut MemoryTx,
        telegram_id: i64,
        counters: &ActionCounters,
    ) -> Result<UserStats, ProgressionError> {
        self.check(FailPoint::StatsSync)?;
        let xp_total = tx.world.xp_total(telegram_id);
        let level = tx.world.level_for(xp_total);
        let now = tx.world.now();
        let stats = tx.world.stats_mut(telegram_id)?;
        stats.words_learned += counters.words_learned;
        stats.tasks_completed += counters.tasks_completed;
        stats.mini_games_played += counters.mini_games_played;
        stats.xp_total = xp_total;
        stats.level = level;
        stats.last_active_at = Some(now);
        Ok(stats.clone())
    }

    async fn has_streak_incremented_today(
        &self,
        tx: &mut MemoryTx,
        telegram_id: i64,
    ) -> Result<bool, ProgressionError> {
        self.check(FailPoint::StreakCheck)?;
        let today = tx.world.today();
        let stats = tx.world.stats_mut(telegram_id)?;
        Ok(stats.last_streak_date == Some(today))
    }

    async fn ensure_streak_increment_today(
        &self,
        tx: &mut MemoryTx,
        telegram_id: i64,
    ) -> Result<(), ProgressionError> {
        self.check(FailPoint::StreakIncrement)?;
        let today = tx.world.today();
        let stats = tx.world.stats_mut(telegram_id)?;
        if stats.last_streak_date == Some(today) {
            return Ok(());
        }
        stats.streak_days = if stats.last_streak_date == Some(today - Duration::days(1)) {
            stats.streak_days + 1
        } else {
            1
        };
        stats.longest_streak = stats.longest_streak.max(stats.streak_days);
        stats.last_streak_date = Some(today);
        Ok(())
    }
}

#[async_trait]
impl EventTypeRepository<MemoryTx> for MemoryStore {
    async fn exists_by_name(&self, tx: &mut MemoryTx, name: &str) -> Result<bool, ProgressionError> {
        self.check(FailPoint::EventTypeExists)?;
        Ok(tx
            .world
            .event_types
            .iter()
            .any(|t| t.name == name && t.enabled))
    }

    async fn get_by_name(
        &self,
        tx: &mut MemoryTx,
        name: &str,
    ) -> Result<EventType, ProgressionError> {
        self.check(FailPoint::EventTypeGet)?;
        tx.world
            .event_types
            .iter()
            .find(|t| t.name == name)
            .cloned()
            .ok_or_else(|| ProgressionError::EventTypeNotFound(name.to_string()))
    }
}

#[async_trait]
impl XpEventRepository<MemoryTx> for MemoryStore {
    async fn create(
        &self,
        tx: &mut MemoryTx,
        telegram_id: i64,
        event_type_name: &str,
        delta_xp: i64,
    ) -> Result<XpEvent, ProgressionError> {
        self.check(FailPoint::XpCreate)?;
        let event_type_id = tx
            .world
            .event_types
            .iter()
            .find(|t| t.name == event_type_name)
            .map(|t| t.id)
            .ok_or_else(|| ProgressionError::EventTypeNotFound(event_type_name.to_string()))?;
        let now = tx.world.now();
        let event = XpEvent {
            id: tx.world.next_event_id(),
            event_type_id,
            telegram_id,
            delta_xp,
            occurred_at: now,
            inserted_at: now,
            week_start: week_start_of(now),
        };
        tx.world.xp_events.push(event.clone());
        Ok(event)
    }
}

#[async_trait]
impl LevelRepository<MemoryTx> for MemoryStore {
    async fn back_fill_missing_level_history(
        &self,
        tx: &mut MemoryTx,
        telegram_id: i64,
    ) -> Result<LevelProgress, ProgressionError> {
        self.check(FailPoint::LevelBackfill)?;
        let world = &mut tx.world;
        let current = world.stats_mut(telegram_id)?.level;
        let recorded = world.history_levels(telegram_id);
        let old_level = recorded.iter().copied().max().unwrap_or(1);
        let xp_total = world.xp_total(telegram_id);
        let last_event = world
            .xp_events
            .iter()
            .filter(|e| e.telegram_id == telegram_id)
            .map(|e| e.id)
            .max();
        let now = world.now();

        let missing: Vec<i32> = world
            .levels
            .iter()
            .map(|(level, _)| *level)
            .filter(|level| *level <= current && !recorded.contains(level))
            .collect();
        for level_number in missing {
            world.level_history.push(LevelHistoryEntry {
                telegram_id,
                level_number,
                xp_at_reach: xp_total,
                xp_event_id: last_event,
                reached_at: now,
            });
        }

        Ok(LevelProgress {
            is_level_up: current > old_level,
            old_level,
            new_level: current.max(old_level),
        })
    }
}

#[async_trait]
impl InternalCurrencyRepository<MemoryTx> for MemoryStore {
    async fn add_balance(
        &self,
        tx: &mut MemoryTx,
        event_type_id: i32,
        telegram_id: i64,
        amount: Decimal,
        description: &str,
    ) -> Result<Decimal, ProgressionError> {
        self.check(FailPoint::CurrencyAdd)?;
        if amount <= Decimal::ZERO {
            return Err(ProgressionError::NonPositiveAmount(amount));
        }
        let current = tx
            .world
            .balances
            .get(&telegram_id)
            .copied()
            .unwrap_or(Decimal::ZERO);
        let balance = current + amount;
        if balance < Decimal::ZERO {
            return Err(ProgressionError::NegativeBalance {
                telegram_id,
                balance,
            });
        }
        tx.world.currency_transactions.push(CurrencyTransaction {
            telegram_id,
            event_type_id,
            amount,
            balance_after: balance,
            description: description.to_string(),
        });
        tx.world.balances.insert(telegram_id, balance);
        Ok(balance)
    }
}

#[async_trait]
impl AchievementRepository<MemoryTx> for MemoryStore {
    async fn unlock_available(
        &self,
        tx: &mut MemoryTx,
        telegram_id: i64,
    ) -> Result<Vec<UnlockedAchievement>, ProgressionError> {
        self.check(FailPoint::AchievementUnlock)?;
        let world = &mut tx.world;
        let stats = world.stats_mut(telegram_id)?.clone();
        let mut unlocked = Vec::new();
        for achievement in &world.achievements {
            let value = match achievement.metric {
                "xp_total" => stats.xp_total,
                "level" => i64::from(stats.level),
                "streak_days" => i64::from(stats.streak_days),
                "words_learned" => stats.words_learned,
                "tasks_completed" => stats.tasks_completed,
                "mini_games_played" => stats.mini_games_played,
                _ => continue,
            };
            if value >= achievement.threshold
                && world.user_achievements.insert((telegram_id, achievement.id))
            {
                unlocked.push(UnlockedAchievement {
                    achievement_id: achievement.id,
                    achievement_name: achievement.name.clone(),
                });
            }
        }
        Ok(unlocked)
    }
}

#[async_trait]
impl NotificationRepository<MemoryTx> for MemoryStore {
    async fn create_many(
        &self,
        tx: &mut MemoryTx,
        notifications: Vec<NewNotification>,
    ) -> Result<Vec<Notification>, ProgressionError> {
        self.check(FailPoint::NotificationCreate)?;
        let now = tx.world.now();
        let mut created = Vec::with_capacity(notifications.len());
        for new in notifications {
            let id = tx.world.notifications.last().map_or(1, |n| n.id + 1);
            let notification = Notification {
                id,
                telegram_id: new.telegram_id,
                kind: new.kind.as_str().to_string(),
                message: new.message,
                created_at: now,
            };
            tx.world.notifications.push(notification.clone());
            created.push(notification);
        }
        Ok(created)
    }
}

#[derive(Clone, Default)]
pub struct FakePresence {
    present: Arc<Mutex<HashSet<i64>>>,
    failing: Arc<Mutex<bool>>,
}

impl FakePresence {
    pub fn set_present(&self, telegram_id: i64) {
        self.present.lock().insert(telegram_id);
    }

    pub fn fail(&self) {
        *self.failing.lock() = true;
    }
}

#[async_trait]
impl PresenceCache for FakePresence {
    async fn exists(&self, telegram_id: i64) -> Result<bool> {
        if *self.failing.lock() {
            return Err(anyhow!("presence cache unreachable"));
        }
        Ok(self.present.lock().contains(&telegram_id))
    }
}

#[derive(Clone, Default)]
pub struct RecordingBus {
    published: Arc<Mutex<Vec<(i64, Notification)>>>,
    attempts: Arc<AtomicUsize>,
    failing: Arc<Mutex<bool>>,
}

impl RecordingBus {
    pub fn fail(&self) {
        *self.failing.lock() = true;
    }

    pub fn published(&self) -> Vec<(i64, Notification)> {
        self.published.lock().clone()
    }

    pub fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl MessageBus for RecordingBus {
    async fn publish(&self, telegram_id: i64, notification: &Notification) -> Result<()> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        if *self.failing.lock() {
            return Err(anyhow!("bus connection reset"));
        }
        self.published
            .lock()
            .push((telegram_id, notification.clone()));
        Ok(())
    }
}

pub struct Harness {
    pub store: MemoryStore,
    pub presence: FakePresence,
    pub bus: RecordingBus,
    pub orchestrator: EventIngestionOrchestrator<MemoryStore>,
}

impl Harness {
    pub fn new(world: World) -> Self {
        let store = MemoryStore::new(world);
        let presence = FakePresence::default();
        let bus = RecordingBus::default();
        let orchestrator = EventIngestionOrchestrator::builder(store.clone())
            .users(store.clone())
            .user_stats(store.clone())
            .event_types(store.clone())
            .xp_events(store.clone())
            .levels(store.clone())
            .currency(store.clone())
            .achievements(store.clone())
            .notifications(store.clone())
            .presence(presence.clone())
            .message_bus(bus.clone())
            .build()
            .expect("all collaborators provided");

        Self {
            store,
            presence,
            bus,
            orchestrator,
        }
    }

    pub fn seeded() -> Self {
        Self::new(World::seeded())
    }
}
