//! crates/study_shield_core/src/session.rs
//!
//! The study-session lifecycle: Running ⇄ Paused → Closed.
//!
//! Transitions are plain methods on [`StudySession`] that take `now` explicitly;
//! [`SessionService`] wraps them with ownership checks and persistence.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::info;
use uuid::Uuid;

use crate::domain::{SessionState, StudySession, Task};
use crate::error::{CoreError, CoreResult};
use crate::ports::{Clock, EntityStore};
use crate::progression::ProgressionEngine;

//=========================================================================================
// State Transitions
//=========================================================================================

/// Final figures reported by the client when a session ends.
#[derive(Debug, Clone, Default)]
pub struct CompleteSession {
    pub actual_duration: u32,
    pub distractions_blocked: u32,
    pub notes: Option<String>,
}

impl StudySession {
    /// A new running session whose heartbeat starts at `now`.
    pub fn start(owner_id: Uuid, tasks: Vec<Task>, planned_duration: u32, now: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            owner_id,
            tasks,
            planned_duration,
            actual_duration: None,
            start_time: now,
            end_time: None,
            is_paused: false,
            paused_at: None,
            total_paused: 0,
            last_heartbeat: now,
            distractions_blocked: 0,
            notes: None,
        }
    }

    pub fn state(&self) -> SessionState {
        if self.end_time.is_some() {
            SessionState::Closed
        } else if self.is_paused {
            SessionState::Paused
        } else {
            SessionState::Running
        }
    }

    pub fn is_open(&self) -> bool {
        self.end_time.is_none()
    }

    fn ensure_open(&self) -> CoreResult<()> {
        if self.is_open() {
            Ok(())
        } else {
            Err(CoreError::InvalidState("Session already completed".to_string()))
        }
    }

    pub fn record_heartbeat(&mut self, now: DateTime<Utc>) -> CoreResult<()> {
        self.ensure_open()?;
        self.last_heartbeat = now;
        Ok(())
    }

    pub fn pause(&mut self, now: DateTime<Utc>) -> CoreResult<()> {
        self.ensure_open()?;
        if self.is_paused {
            return Err(CoreError::InvalidState("Already paused".to_string()));
        }
        self.is_paused = true;
        self.paused_at = Some(now);
        Ok(())
    }

    /// Leaves the paused state, returning the whole seconds added to `total_paused`.
    pub fn resume(&mut self, now: DateTime<Utc>) -> CoreResult<u64> {
        self.ensure_open()?;
        if !self.is_paused {
            return Err(CoreError::InvalidState("Not paused".to_string()));
        }
        let elapsed = self
            .paused_at
            .map(|at| (now - at).num_seconds().max(0) as u64)
            .unwrap_or(0);
        self.total_paused += elapsed;
        self.is_paused = false;
        self.paused_at = None;
        Ok(elapsed)
    }

    /// Inactivity transition applied by the monitor. Unlike [`pause`](Self::pause)
    /// it never fails; callers select only running sessions.
    pub fn auto_pause(&mut self, now: DateTime<Utc>) {
        self.is_paused = true;
        self.paused_at = Some(now);
    }

    pub fn complete(&mut self, input: CompleteSession, now: DateTime<Utc>) -> CoreResult<()> {
        self.ensure_open()?;
        self.end_time = Some(now);
        self.actual_duration = Some(input.actual_duration);
        self.distractions_blocked = input.distractions_blocked;
        self.notes = input.notes;
        allocate_completed_tasks(&mut self.tasks, input.actual_duration);
        Ok(())
    }
}

/// Greedily marks tasks complete in order while their planned minutes fit in
/// what is left of `actual_duration`; stops at the first task that does not fit.
pub fn allocate_completed_tasks(tasks: &mut [Task], actual_duration: u32) {
    let mut remaining = actual_duration;
    for task in tasks.iter_mut() {
        if task.duration > remaining {
            break;
        }
        task.completed = true;
        remaining -= task.duration;
    }
}

//=========================================================================================
// Session Service
//=========================================================================================

/// What the caller gets back after closing a session.
#[derive(Debug, Clone, Serialize)]
pub struct CompletionSummary {
    pub session_id: Uuid,
    pub actual_duration: u32,
    pub distractions_blocked: u32,
    pub tasks_completed: usize,
    pub tasks_total: usize,
    pub total_paused: u64,
    pub total_focus_time: u64,
}

#[derive(Clone)]
pub struct SessionService {
    store: Arc<dyn EntityStore>,
    clock: Arc<dyn Clock>,
    progression: ProgressionEngine,
}

impl SessionService {
    pub fn new(store: Arc<dyn EntityStore>, clock: Arc<dyn Clock>) -> Self {
        let progression = ProgressionEngine::new(store.clone(), clock.clone());
        Self {
            store,
            clock,
            progression,
        }
    }

    /// Loads a session and checks it belongs to `caller`.
    async fn load_owned(&self, caller: Uuid, session_id: Uuid) -> CoreResult<StudySession> {
        let session = self.store.get_session(session_id).await.map_err(|e| match e {
            crate::ports::PortError::NotFound(_) => {
                CoreError::NotFound("Session not found".to_string())
            }
            other => other.into(),
        })?;
        if session.owner_id != caller {
            return Err(CoreError::Forbidden(
                "Not authorized to access this session".to_string(),
            ));
        }
        Ok(session)
    }

    /// Creates a running session and makes it the owner's current session,
    /// replacing any earlier link.
    pub async fn start(
        &self,
        owner_id: Uuid,
        tasks: Vec<Task>,
        planned_duration: u32,
    ) -> CoreResult<StudySession> {
        let mut user = self.store.get_user(owner_id).await?;
        let session = StudySession::start(owner_id, tasks, planned_duration, self.clock.now());
        self.store.insert_session(&session).await?;

        user.current_session = Some(session.id);
        self.store.save_user(&user).await?;

        info!(session_id = %session.id, user_id = %owner_id, planned_duration, "Study session started");
        Ok(session)
    }

    pub async fn get(&self, caller: Uuid, session_id: Uuid) -> CoreResult<StudySession> {
        self.load_owned(caller, session_id).await
    }

    pub async fn list(&self, caller: Uuid) -> CoreResult<Vec<StudySession>> {
        Ok(self.store.list_sessions_by_owner(caller).await?)
    }

    pub async fn last_active(&self, caller: Uuid) -> CoreResult<Option<StudySession>> {
        Ok(self.store.find_open_session(caller).await?)
    }

    pub async fn heartbeat(&self, caller: Uuid, session_id: Uuid) -> CoreResult<StudySession> {
        let mut session = self.load_owned(caller, session_id).await?;
        session.record_heartbeat(self.clock.now())?;
        self.store.save_session(&session).await?;
        Ok(session)
    }

    pub async fn pause(&self, caller: Uuid, session_id: Uuid) -> CoreResult<StudySession> {
        let mut session = self.load_owned(caller, session_id).await?;
        session.pause(self.clock.now())?;
        self.store.save_session(&session).await?;
        info!(session_id = %session_id, "Study session paused");
        Ok(session)
    }

    pub async fn resume(&self, caller: Uuid, session_id: Uuid) -> CoreResult<StudySession> {
        let mut session = self.load_owned(caller, session_id).await?;
        let added = session.resume(self.clock.now())?;
        self.store.save_session(&session).await?;
        info!(session_id = %session_id, paused_secs = added, "Study session resumed");
        Ok(session)
    }

    /// Closes the session, hands its figures to the progression engine and
    /// clears the owner's current-session link.
    pub async fn complete(
        &self,
        caller: Uuid,
        session_id: Uuid,
        input: CompleteSession,
    ) -> CoreResult<CompletionSummary> {
        let mut session = self.load_owned(caller, session_id).await?;
        let actual_duration = input.actual_duration;
        let distractions_blocked = input.distractions_blocked;
        session.complete(input, self.clock.now())?;
        self.store.save_session(&session).await?;

        let mut user = self
            .progression
            .apply_completion(session.owner_id, actual_duration, distractions_blocked)
            .await?;
        user.current_session = None;
        self.store.save_user(&user).await?;

        info!(
            session_id = %session_id,
            user_id = %session.owner_id,
            actual_duration,
            distractions_blocked,
            "Study session completed"
        );

        Ok(CompletionSummary {
            session_id,
            actual_duration,
            distractions_blocked,
            tasks_completed: session.tasks.iter().filter(|t| t.completed).count(),
            tasks_total: session.tasks.len(),
            total_paused: session.total_paused,
            total_focus_time: user.total_focus_time,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 1, 9, 0, 0).unwrap()
    }

    fn tasks(list: &[(&str, u32)]) -> Vec<Task> {
        list.iter().map(|(n, d)| Task::new(*n, *d)).collect()
    }

    fn completed(tasks: &[Task]) -> Vec<bool> {
        tasks.iter().map(|t| t.completed).collect()
    }

    #[test]
    fn allocation_stops_at_first_task_that_does_not_fit() {
        let mut ts = tasks(&[("Math", 45), ("Reading", 30)]);
        allocate_completed_tasks(&mut ts, 60);
        assert_eq!(completed(&ts), vec![true, false]);
    }

    #[test]
    fn allocation_does_not_skip_ahead_to_smaller_tasks() {
        let mut ts = tasks(&[("Essay", 50), ("Flashcards", 5)]);
        allocate_completed_tasks(&mut ts, 40);
        assert_eq!(completed(&ts), vec![false, false]);
    }

    #[test]
    fn allocation_completes_ties_and_zero_length_tasks() {
        let mut ts = tasks(&[("Warmup", 0), ("Math", 30), ("Break", 0), ("Review", 1)]);
        allocate_completed_tasks(&mut ts, 30);
        assert_eq!(completed(&ts), vec![true, true, true, false]);
    }

    #[test]
    fn pause_then_resume_accumulates_floored_seconds() {
        let mut s = StudySession::start(Uuid::new_v4(), vec![], 25, t0());
        assert_eq!(s.state(), SessionState::Running);

        s.pause(t0() + Duration::seconds(10)).unwrap();
        assert_eq!(s.state(), SessionState::Paused);
        assert!(s.paused_at.is_some());

        let added = s
            .resume(t0() + Duration::seconds(10) + Duration::milliseconds(95_900))
            .unwrap();
        assert_eq!(added, 95);
        assert_eq!(s.total_paused, 95);
        assert_eq!(s.paused_at, None);
        assert_eq!(s.state(), SessionState::Running);
    }

    #[test]
    fn double_pause_and_stray_resume_are_rejected() {
        let mut s = StudySession::start(Uuid::new_v4(), vec![], 25, t0());
        assert!(matches!(s.resume(t0()), Err(CoreError::InvalidState(m)) if m == "Not paused"));
        s.pause(t0()).unwrap();
        assert!(matches!(s.pause(t0()), Err(CoreError::InvalidState(m)) if m == "Already paused"));
    }

    #[test]
    fn closed_session_rejects_every_mutation() {
        let mut s = StudySession::start(Uuid::new_v4(), tasks(&[("Math", 10)]), 10, t0());
        s.complete(
            CompleteSession {
                actual_duration: 10,
                distractions_blocked: 2,
                notes: Some("done".into()),
            },
            t0() + Duration::minutes(10),
        )
        .unwrap();

        assert_eq!(s.state(), SessionState::Closed);
        assert!(s.end_time.is_some());
        assert!(s.tasks[0].completed);

        let later = t0() + Duration::minutes(11);
        assert!(matches!(s.pause(later), Err(CoreError::InvalidState(_))));
        assert!(matches!(s.resume(later), Err(CoreError::InvalidState(_))));
        assert!(matches!(s.record_heartbeat(later), Err(CoreError::InvalidState(_))));
        assert!(matches!(
            s.complete(CompleteSession::default(), later),
            Err(CoreError::InvalidState(_))
        ));
        assert_eq!(s.end_time, Some(t0() + Duration::minutes(10)));
    }
}
