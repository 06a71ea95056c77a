//! # Interactions
//!
//! Likes, comments and ratings as the viewer sees them, updated before the server answers.
//!
//! ## State
//!
//! Each edit keeps the last state the server confirmed plus the mutations still in flight, in
//! the order they were made. What the viewer sees is the confirmed state with the pending
//! mutations replayed on top.
//!
//! - On success the server's answer is folded into the confirmed state and the mutation is
//!   dropped from the pending list.
//! - On failure the mutation is dropped and nothing else changes. No error reaches the viewer,
//!   the failure is only logged.
//!
//! Two mutations on the same edit never undo each other: a failing one removes itself, not a
//! snapshot taken before a later one.
//!
//! ## Ordering
//!
//! Answers are folded in the order they arrive. If the network reorders two successful
//! writes the confirmed state follows the later answer, [`Interactions::refresh`] resyncs.
//! Pending mutations stay on top of a refreshed state; a draft comment the refresh already
//! lists as stored is dropped so it is not shown twice.
use std::{
    collections::HashMap,
    sync::{
        Mutex, MutexGuard, PoisonError, RwLock,
        atomic::{AtomicU64, Ordering},
    },
};

use catalog::{
    EditId,
    payloads::{Comment, MAX_RATING, MIN_RATING},
};
use chrono::Utc;
use tracing::{debug, warn};

use crate::{
    api::Remote,
    error::ClientError,
    session::{Session, SessionUser},
};

#[derive(Debug, Clone, Default, PartialEq)]
pub struct EditState {
    pub liked: bool,
    pub likes_count: usize,
    /// Oldest first.
    pub comments: Vec<Comment>,
    pub my_rating: Option<u8>,
    pub average_rating: f64,
    pub ratings_count: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Confirmed,
    Reverted,
}

#[derive(Debug, Clone)]
enum Op {
    Like(bool),
    AddComment(Comment),
    DeleteComment(String),
    Rate(u8),
}

impl Op {
    fn apply(&self, state: &mut EditState) {
        match self {
            Op::Like(liked) => {
                if state.liked != *liked {
                    state.liked = *liked;
                    state.likes_count = if *liked {
                        state.likes_count + 1
                    } else {
                        state.likes_count.saturating_sub(1)
                    };
                }
            }
            Op::AddComment(comment) => state.comments.push(comment.clone()),
            Op::DeleteComment(id) => state.comments.retain(|comment| &comment.id != id),
            Op::Rate(rating) => {
                let total = state.average_rating * state.ratings_count as f64;
                let (total, count) = match state.my_rating {
                    Some(old) => (total - f64::from(old) + f64::from(*rating), state.ratings_count),
                    None => (total + f64::from(*rating), state.ratings_count + 1),
                };

                state.my_rating = Some(*rating);
                state.ratings_count = count.max(1);
                state.average_rating = total / state.ratings_count as f64;
            }
        }
    }
}

/// Drops pending drafts whose comment shows up in a refreshed list: a comment by the same user
/// with the same text that was not confirmed before. Each server comment settles one draft.
fn settle_drafts(pending: &mut Vec<Pending>, before: &[Comment], after: &[Comment]) {
    let mut fresh: Vec<&Comment> = after
        .iter()
        .filter(|comment| !before.iter().any(|known| known.id == comment.id))
        .collect();

    pending.retain(|pending| {
        let Op::AddComment(draft) = &pending.op else {
            return true;
        };

        match fresh
            .iter()
            .position(|comment| comment.user_id == draft.user_id && comment.text == draft.text)
        {
            Some(index) => {
                let stored = fresh.remove(index);
                debug!("Draft comment {} already stored as {}", draft.id, stored.id);
                false
            }
            None => true,
        }
    });
}

struct Pending {
    ticket: u64,
    op: Op,
}

#[derive(Default)]
struct Entry {
    confirmed: EditState,
    pending: Vec<Pending>,
}

impl Entry {
    fn view(&self) -> EditState {
        let mut state = self.confirmed.clone();
        for pending in &self.pending {
            pending.op.apply(&mut state);
        }

        state
    }
}

pub struct Interactions<R> {
    remote: R,
    entries: Mutex<HashMap<EditId, Entry>>,
    tickets: AtomicU64,
    session: RwLock<Option<Session>>,
}

impl<R: Remote> Interactions<R> {
    pub fn new(remote: R) -> Self {
        Self {
            remote,
            entries: Mutex::new(HashMap::new()),
            tickets: AtomicU64::new(1),
            session: RwLock::new(None),
        }
    }

    pub fn remote(&self) -> &R {
        &self.remote
    }

    /// Replaces the signed in user. Everything loaded so far belonged to the previous viewer and
    /// is dropped, answers still in flight are ignored.
    pub fn set_session(&self, session: Option<Session>) {
        *self.session.write().unwrap_or_else(PoisonError::into_inner) = session;
        self.entries().clear();
    }

    pub fn session(&self) -> Option<Session> {
        self.session
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn entries(&self) -> MutexGuard<'_, HashMap<EditId, Entry>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn signed_in(&self, action: &'static str) -> Result<(String, SessionUser), ClientError> {
        self.session()
            .map(|session| (session.access_token, session.user))
            .ok_or(ClientError::SignInRequired(action))
    }

    fn token(&self) -> Option<String> {
        self.session().map(|session| session.access_token)
    }

    /// Pulls every edit in `edit_ids`. Edits that fail to load keep their previous state.
    pub async fn load(&self, edit_ids: &[EditId]) {
        for &edit_id in edit_ids {
            if let Err(e) = self.refresh(edit_id).await {
                warn!("Failed to load interactions for edit {edit_id}: {e}");
            }
        }
    }

    pub async fn refresh(&self, edit_id: EditId) -> Result<(), ClientError> {
        let token = self.token();

        let likes = self.remote.likes(edit_id, token.as_deref()).await?;
        let comments = self.remote.comments(edit_id).await?;
        let ratings = self.remote.ratings(edit_id, token.as_deref()).await?;

        if self.token() != token {
            debug!("Session changed while loading edit {edit_id}, dropping result");
            return Ok(());
        }

        let mut entries = self.entries();
        let entry = entries.entry(edit_id).or_default();
        settle_drafts(&mut entry.pending, &entry.confirmed.comments, &comments);
        entry.confirmed = EditState {
            liked: likes.is_liked,
            likes_count: likes.count,
            comments,
            my_rating: ratings.my_rating,
            average_rating: ratings.average,
            ratings_count: ratings.count,
        };

        Ok(())
    }

    /// Queues the op built from the current view. Reading the view and queueing happen under
    /// one lock, so concurrent toggles each see the one queued before them.
    fn begin(&self, edit_id: EditId, op: impl FnOnce(&EditState) -> Op) -> u64 {
        let ticket = self.tickets.fetch_add(1, Ordering::Relaxed);

        let mut entries = self.entries();
        let entry = entries.entry(edit_id).or_default();
        let op = op(&entry.view());
        entry.pending.push(Pending { ticket, op });

        ticket
    }

    fn finish<T>(
        &self,
        edit_id: EditId,
        ticket: u64,
        result: Result<T, ClientError>,
        fold: impl FnOnce(&mut EditState, T),
    ) -> Outcome {
        let mut entries = self.entries();
        let entry = entries.get_mut(&edit_id).and_then(|entry| {
            let index = entry.pending.iter().position(|p| p.ticket == ticket)?;
            entry.pending.remove(index);
            Some(entry)
        });

        match result {
            Ok(value) => {
                if let Some(entry) = entry {
                    fold(&mut entry.confirmed, value);
                }
                Outcome::Confirmed
            }
            Err(e) => {
                warn!("Reverting change on edit {edit_id}: {e}");
                Outcome::Reverted
            }
        }
    }

    pub async fn toggle_like(&self, edit_id: EditId) -> Result<Outcome, ClientError> {
        let (token, _) = self.signed_in("like edits")?;

        let mut liked = true;
        let ticket = self.begin(edit_id, |view| {
            liked = !view.liked;
            Op::Like(liked)
        });

        let result = self.remote.set_like(&token, edit_id, liked).await;

        Ok(self.finish(edit_id, ticket, result, |state, likes| {
            state.liked = likes.is_liked;
            state.likes_count = likes.count;
        }))
    }

    pub async fn add_comment(&self, edit_id: EditId, text: &str) -> Result<Outcome, ClientError> {
        let (token, user) = self.signed_in("comment")?;

        let text = text.trim();
        if text.is_empty() {
            return Err(ClientError::EmptyComment);
        }

        let ticket = self.tickets.fetch_add(1, Ordering::Relaxed);
        let draft = Comment {
            id: format!("pending-{ticket}"),
            edit_id,
            user_id: user.id.clone(),
            username: user.display_name(),
            avatar: None,
            text: text.to_string(),
            created_at: Utc::now(),
        };
        self.entries()
            .entry(edit_id)
            .or_default()
            .pending
            .push(Pending {
                ticket,
                op: Op::AddComment(draft),
            });

        let result = self.remote.add_comment(&token, edit_id, text).await;

        Ok(self.finish(edit_id, ticket, result, |state, comment| {
            if !state.comments.iter().any(|known| known.id == comment.id) {
                state.comments.push(comment);
            }
        }))
    }

    pub async fn delete_comment(
        &self,
        edit_id: EditId,
        comment_id: &str,
    ) -> Result<Outcome, ClientError> {
        let (token, _) = self.signed_in("delete comments")?;

        let ticket = self.begin(edit_id, |_| Op::DeleteComment(comment_id.to_string()));

        let result = self.remote.delete_comment(&token, edit_id, comment_id).await;

        Ok(self.finish(edit_id, ticket, result, |state, ()| {
            state.comments.retain(|comment| comment.id != comment_id);
        }))
    }

    pub async fn set_rating(&self, edit_id: EditId, rating: u8) -> Result<Outcome, ClientError> {
        let (token, _) = self.signed_in("rate edits")?;

        if !(MIN_RATING..=MAX_RATING).contains(&i64::from(rating)) {
            return Err(ClientError::InvalidRating);
        }

        let ticket = self.begin(edit_id, |_| Op::Rate(rating));

        let result = self.remote.set_rating(&token, edit_id, rating).await;

        Ok(self.finish(edit_id, ticket, result, |state, saved| {
            state.my_rating = Some(saved.rating);
            state.average_rating = saved.average;
            state.ratings_count = saved.count;
        }))
    }

    pub fn state(&self, edit_id: EditId) -> EditState {
        self.entries()
            .get(&edit_id)
            .map(Entry::view)
            .unwrap_or_default()
    }

    pub fn is_liked(&self, edit_id: EditId) -> bool {
        self.state(edit_id).liked
    }

    pub fn likes_count(&self, edit_id: EditId) -> usize {
        self.state(edit_id).likes_count
    }

    /// Newest first.
    pub fn comments(&self, edit_id: EditId) -> Vec<Comment> {
        let mut comments = self.state(edit_id).comments;
        comments.reverse();

        comments
    }

    pub fn my_rating(&self, edit_id: EditId) -> Option<u8> {
        self.state(edit_id).my_rating
    }

    pub fn average_rating(&self, edit_id: EditId) -> f64 {
        self.state(edit_id).average_rating
    }

    pub fn ratings_count(&self, edit_id: EditId) -> usize {
        self.state(edit_id).ratings_count
    }

    pub fn has_pending(&self, edit_id: EditId) -> bool {
        self.entries()
            .get(&edit_id)
            .is_some_and(|entry| !entry.pending.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use std::{collections::VecDeque, sync::Arc};

    use catalog::payloads::{LikesResponse, RatingResponse, RatingsResponse};
    use tokio::{sync::Semaphore, task::yield_now};

    use super::*;
    use crate::session::UserMetadata;

    const EDIT: EditId = 3;

    #[derive(Default)]
    struct Server {
        liked: bool,
        other_likes: usize,
        comments: Vec<Comment>,
        my_rating: Option<u8>,
        other_ratings: Vec<u8>,
        next_comment: usize,
    }

    impl Server {
        fn likes(&self) -> LikesResponse {
            LikesResponse {
                likes: Vec::new(),
                count: self.other_likes + usize::from(self.liked),
                is_liked: self.liked,
            }
        }

        fn rating_summary(&self) -> (f64, usize) {
            let all: Vec<u8> = self
                .other_ratings
                .iter()
                .copied()
                .chain(self.my_rating)
                .collect();
            if all.is_empty() {
                return (0.0, 0);
            }
            let sum: u32 = all.iter().map(|r| u32::from(*r)).sum();

            (f64::from(sum) / all.len() as f64, all.len())
        }
    }

    /// What the next mutating call does: how often it yields before answering, whether it
    /// waits for a `release` permit, and whether it fails.
    #[derive(Clone, Copy, Default)]
    struct Step {
        yields: usize,
        hold: bool,
        fail: bool,
    }

    struct FakeRemote {
        server: Mutex<Server>,
        script: Mutex<VecDeque<Step>>,
        release: Arc<Semaphore>,
        /// Desired like states in the order they reached the server.
        sent: Mutex<Vec<bool>>,
    }

    impl Default for FakeRemote {
        fn default() -> Self {
            Self {
                server: Mutex::default(),
                script: Mutex::default(),
                release: Arc::new(Semaphore::new(0)),
                sent: Mutex::default(),
            }
        }
    }

    impl FakeRemote {
        fn script(self, steps: impl IntoIterator<Item = Step>) -> Self {
            self.script.lock().unwrap().extend(steps);
            self
        }

        async fn step(&self) -> Result<(), ClientError> {
            let step = self.script.lock().unwrap().pop_front().unwrap_or_default();

            for _ in 0..step.yields {
                yield_now().await;
            }
            if step.hold {
                self.release.acquire().await.expect("release gate").forget();
            }

            if step.fail {
                Err(ClientError::Status {
                    status: 500,
                    message: "Server error".to_string(),
                })
            } else {
                Ok(())
            }
        }
    }

    impl Remote for FakeRemote {
        async fn likes(
            &self,
            _edit_id: EditId,
            _token: Option<&str>,
        ) -> Result<LikesResponse, ClientError> {
            Ok(self.server.lock().unwrap().likes())
        }

        async fn set_like(
            &self,
            _token: &str,
            _edit_id: EditId,
            liked: bool,
        ) -> Result<LikesResponse, ClientError> {
            self.sent.lock().unwrap().push(liked);
            self.step().await?;

            let mut server = self.server.lock().unwrap();
            server.liked = liked;

            Ok(server.likes())
        }

        async fn comments(&self, _edit_id: EditId) -> Result<Vec<Comment>, ClientError> {
            Ok(self.server.lock().unwrap().comments.clone())
        }

        /// Stores first, then answers: a held call leaves the comment visible to refreshes.
        async fn add_comment(
            &self,
            _token: &str,
            edit_id: EditId,
            text: &str,
        ) -> Result<Comment, ClientError> {
            let comment = {
                let mut server = self.server.lock().unwrap();
                server.next_comment += 1;
                let comment = Comment {
                    id: format!("c{}", server.next_comment),
                    edit_id,
                    user_id: "kai".to_string(),
                    username: "Kai".to_string(),
                    avatar: Some("https://ui-avatars.com/api/?name=Kai".to_string()),
                    text: text.to_string(),
                    created_at: Utc::now(),
                };
                server.comments.push(comment.clone());
                comment
            };

            self.step().await?;

            Ok(comment)
        }

        async fn delete_comment(
            &self,
            _token: &str,
            _edit_id: EditId,
            comment_id: &str,
        ) -> Result<(), ClientError> {
            self.step().await?;

            self.server
                .lock()
                .unwrap()
                .comments
                .retain(|comment| comment.id != comment_id);

            Ok(())
        }

        async fn ratings(
            &self,
            _edit_id: EditId,
            _token: Option<&str>,
        ) -> Result<RatingsResponse, ClientError> {
            let server = self.server.lock().unwrap();
            let (average, count) = server.rating_summary();

            Ok(RatingsResponse {
                ratings: Vec::new(),
                average,
                count,
                my_rating: server.my_rating,
            })
        }

        async fn set_rating(
            &self,
            _token: &str,
            _edit_id: EditId,
            rating: u8,
        ) -> Result<RatingResponse, ClientError> {
            self.step().await?;

            let mut server = self.server.lock().unwrap();
            server.my_rating = Some(rating);
            let (average, count) = server.rating_summary();

            Ok(RatingResponse {
                rating,
                average,
                count,
            })
        }
    }

    fn session() -> Session {
        Session {
            access_token: "kai-token".to_string(),
            refresh_token: None,
            user: SessionUser {
                id: "kai".to_string(),
                email: Some("kai@example.com".to_string()),
                user_metadata: UserMetadata {
                    username: Some("Kai".to_string()),
                },
            },
        }
    }

    async fn signed_in(remote: FakeRemote) -> Interactions<FakeRemote> {
        let interactions = Interactions::new(remote);
        interactions.set_session(Some(session()));
        interactions.load(&[EDIT]).await;

        interactions
    }

    const FAIL: Step = Step {
        yields: 0,
        hold: false,
        fail: true,
    };

    const HOLD: Step = Step {
        yields: 0,
        hold: true,
        fail: false,
    };

    #[tokio::test]
    async fn load_pulls_server_state() {
        let remote = FakeRemote::default();
        {
            let mut server = remote.server.lock().unwrap();
            server.other_likes = 4;
            server.other_ratings = vec![4, 2];
        }

        let interactions = signed_in(remote).await;

        assert!(!interactions.is_liked(EDIT));
        assert_eq!(interactions.likes_count(EDIT), 4);
        assert_eq!(interactions.average_rating(EDIT), 3.0);
        assert_eq!(interactions.ratings_count(EDIT), 2);
        assert_eq!(interactions.my_rating(EDIT), None);
    }

    #[tokio::test]
    async fn mutations_require_a_session() {
        let interactions = Interactions::new(FakeRemote::default());

        assert!(matches!(
            interactions.toggle_like(EDIT).await,
            Err(ClientError::SignInRequired(_))
        ));
        assert!(matches!(
            interactions.add_comment(EDIT, "nice").await,
            Err(ClientError::SignInRequired(_))
        ));
        assert!(matches!(
            interactions.set_rating(EDIT, 4).await,
            Err(ClientError::SignInRequired(_))
        ));
        assert!(!interactions.has_pending(EDIT));
    }

    #[tokio::test]
    async fn like_shows_before_server_answers() {
        let remote = FakeRemote::default().script([Step {
            hold: true,
            ..Step::default()
        }]);
        let release = remote.release.clone();
        let interactions = signed_in(remote).await;

        let (outcome, ()) = tokio::join!(interactions.toggle_like(EDIT), async {
            yield_now().await;
            assert!(interactions.is_liked(EDIT));
            assert_eq!(interactions.likes_count(EDIT), 1);
            assert!(interactions.has_pending(EDIT));
            release.add_permits(1);
        });

        assert_eq!(outcome.unwrap(), Outcome::Confirmed);
        assert!(interactions.is_liked(EDIT));
        assert!(!interactions.has_pending(EDIT));
    }

    #[tokio::test]
    async fn failed_like_is_undone_silently() {
        let interactions = signed_in(FakeRemote::default().script([FAIL])).await;

        let outcome = interactions.toggle_like(EDIT).await.unwrap();

        assert_eq!(outcome, Outcome::Reverted);
        assert!(!interactions.is_liked(EDIT));
        assert_eq!(interactions.likes_count(EDIT), 0);
    }

    #[tokio::test]
    async fn failing_rating_does_not_clobber_later_success() {
        let remote = FakeRemote::default().script([
            Step {
                yields: 3,
                fail: true,
                ..Step::default()
            },
            Step::default(),
        ]);
        let interactions = signed_in(remote).await;

        let (first, second) = tokio::join!(
            interactions.set_rating(EDIT, 5),
            interactions.set_rating(EDIT, 3)
        );

        assert_eq!(first.unwrap(), Outcome::Reverted);
        assert_eq!(second.unwrap(), Outcome::Confirmed);
        assert_eq!(interactions.my_rating(EDIT), Some(3));
        assert_eq!(interactions.average_rating(EDIT), 3.0);
        assert_eq!(interactions.ratings_count(EDIT), 1);
    }

    #[tokio::test]
    async fn failing_rating_keeps_earlier_pending_one() {
        let remote = FakeRemote::default().script([
            Step {
                hold: true,
                ..Step::default()
            },
            FAIL,
        ]);
        let release = remote.release.clone();
        let interactions = signed_in(remote).await;

        let (first, second) = tokio::join!(interactions.set_rating(EDIT, 5), async {
            let outcome = interactions.set_rating(EDIT, 2).await;
            assert_eq!(interactions.my_rating(EDIT), Some(5));
            release.add_permits(1);
            outcome
        });

        assert_eq!(first.unwrap(), Outcome::Confirmed);
        assert_eq!(second.unwrap(), Outcome::Reverted);
        assert_eq!(interactions.my_rating(EDIT), Some(5));
        assert_eq!(interactions.ratings_count(EDIT), 1);
    }

    #[tokio::test]
    async fn quick_double_like_ends_unliked() {
        let remote = FakeRemote::default().script([
            Step {
                yields: 2,
                ..Step::default()
            },
            Step {
                yields: 4,
                ..Step::default()
            },
        ]);
        let interactions = signed_in(remote).await;

        let (first, second) = tokio::join!(
            interactions.toggle_like(EDIT),
            interactions.toggle_like(EDIT)
        );

        assert_eq!(first.unwrap(), Outcome::Confirmed);
        assert_eq!(second.unwrap(), Outcome::Confirmed);
        assert!(!interactions.is_liked(EDIT));
        assert_eq!(interactions.likes_count(EDIT), 0);
        assert!(!interactions.remote().server.lock().unwrap().liked);
    }

    #[tokio::test]
    async fn comment_gets_server_id_and_shows_newest_first() {
        let interactions = signed_in(FakeRemote::default()).await;

        interactions.add_comment(EDIT, "first").await.unwrap();
        interactions.add_comment(EDIT, "  second  ").await.unwrap();

        let comments = interactions.comments(EDIT);
        let texts: Vec<&str> = comments.iter().map(|c| c.text.as_str()).collect();
        assert_eq!(texts, ["second", "first"]);
        assert_eq!(comments[1].id, "c1");
        assert!(comments[0].avatar.is_some());
    }

    #[tokio::test]
    async fn pending_comment_uses_session_name() {
        let remote = FakeRemote::default().script([Step {
            hold: true,
            ..Step::default()
        }]);
        let release = remote.release.clone();
        let interactions = signed_in(remote).await;

        let (outcome, ()) = tokio::join!(interactions.add_comment(EDIT, "wow"), async {
            yield_now().await;
            let comments = interactions.comments(EDIT);
            assert_eq!(comments.len(), 1);
            assert_eq!(comments[0].username, "Kai");
            assert!(comments[0].id.starts_with("pending-"));
            release.add_permits(1);
        });

        assert_eq!(outcome.unwrap(), Outcome::Confirmed);
        assert!(!interactions.comments(EDIT)[0].id.starts_with("pending-"));
    }

    #[tokio::test]
    async fn empty_comment_is_refused_before_sending() {
        let interactions = signed_in(FakeRemote::default()).await;

        assert!(matches!(
            interactions.add_comment(EDIT, "   ").await,
            Err(ClientError::EmptyComment)
        ));
        assert!(interactions.comments(EDIT).is_empty());
    }

    #[tokio::test]
    async fn failed_delete_restores_comment() {
        let interactions = signed_in(FakeRemote::default()).await;
        interactions.add_comment(EDIT, "keep me").await.unwrap();
        let id = interactions.comments(EDIT)[0].id.clone();

        interactions.remote().script.lock().unwrap().push_back(FAIL);
        let outcome = interactions.delete_comment(EDIT, &id).await.unwrap();

        assert_eq!(outcome, Outcome::Reverted);
        assert_eq!(interactions.comments(EDIT).len(), 1);

        interactions.delete_comment(EDIT, &id).await.unwrap();
        assert!(interactions.comments(EDIT).is_empty());
    }

    #[tokio::test]
    async fn rating_out_of_range_is_refused() {
        let interactions = signed_in(FakeRemote::default()).await;

        assert!(matches!(
            interactions.set_rating(EDIT, 0).await,
            Err(ClientError::InvalidRating)
        ));
        assert!(matches!(
            interactions.set_rating(EDIT, 6).await,
            Err(ClientError::InvalidRating)
        ));
    }

    #[tokio::test]
    async fn rerating_updates_average_from_server() {
        let remote = FakeRemote::default();
        remote.server.lock().unwrap().other_ratings = vec![2];
        let interactions = signed_in(remote).await;

        interactions.set_rating(EDIT, 4).await.unwrap();
        assert_eq!(interactions.average_rating(EDIT), 3.0);
        assert_eq!(interactions.ratings_count(EDIT), 2);

        interactions.set_rating(EDIT, 5).await.unwrap();
        assert_eq!(interactions.average_rating(EDIT), 3.5);
        assert_eq!(interactions.ratings_count(EDIT), 2);
    }

    #[tokio::test]
    async fn session_change_drops_state() {
        let interactions = signed_in(FakeRemote::default()).await;
        interactions.toggle_like(EDIT).await.unwrap();
        assert!(interactions.is_liked(EDIT));

        interactions.set_session(None);

        assert_eq!(interactions.state(EDIT), EditState::default());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_toggles_each_flip_the_previous_one() {
        let remote = FakeRemote::default().script([HOLD; 4]);
        let release = remote.release.clone();
        let interactions = Arc::new(signed_in(remote).await);

        let tasks: Vec<_> = (0..4)
            .map(|_| {
                let interactions = interactions.clone();
                tokio::spawn(async move { interactions.toggle_like(EDIT).await })
            })
            .collect();

        while interactions.remote().sent.lock().unwrap().len() < 4 {
            yield_now().await;
        }
        assert!(!interactions.is_liked(EDIT));
        assert_eq!(interactions.likes_count(EDIT), 0);

        let mut sent = interactions.remote().sent.lock().unwrap().clone();
        sent.sort_unstable();
        assert_eq!(sent, [false, false, true, true]);

        release.add_permits(4);
        for task in tasks {
            assert_eq!(task.await.unwrap().unwrap(), Outcome::Confirmed);
        }
        assert!(!interactions.has_pending(EDIT));
    }

    #[tokio::test]
    async fn refresh_during_pending_comment_shows_it_once() {
        let remote = FakeRemote::default().script([HOLD]);
        let release = remote.release.clone();
        let interactions = signed_in(remote).await;

        let (outcome, ()) = tokio::join!(interactions.add_comment(EDIT, "wow"), async {
            yield_now().await;
            interactions.refresh(EDIT).await.unwrap();

            let comments = interactions.comments(EDIT);
            assert_eq!(comments.len(), 1);
            assert_eq!(comments[0].id, "c1");
            assert!(!interactions.has_pending(EDIT));
            release.add_permits(1);
        });

        assert_eq!(outcome.unwrap(), Outcome::Confirmed);
        assert_eq!(interactions.comments(EDIT).len(), 1);
    }

    #[tokio::test]
    async fn refresh_keeps_pending_like_on_top() {
        let remote = FakeRemote::default().script([HOLD]);
        let release = remote.release.clone();
        let interactions = signed_in(remote).await;

        let (outcome, ()) = tokio::join!(interactions.toggle_like(EDIT), async {
            yield_now().await;
            interactions.refresh(EDIT).await.unwrap();

            assert!(interactions.is_liked(EDIT));
            assert_eq!(interactions.likes_count(EDIT), 1);
            assert!(interactions.has_pending(EDIT));
            release.add_permits(1);
        });

        assert_eq!(outcome.unwrap(), Outcome::Confirmed);
        assert!(interactions.is_liked(EDIT));
        assert_eq!(interactions.likes_count(EDIT), 1);
    }

    #[tokio::test]
    async fn refresh_settles_draft_against_new_comments_only() {
        let remote = FakeRemote::default();
        let interactions = signed_in(remote).await;
        interactions.add_comment(EDIT, "again").await.unwrap();

        interactions.remote().script.lock().unwrap().push_back(HOLD);
        let release = interactions.remote().release.clone();

        let (outcome, ()) = tokio::join!(interactions.add_comment(EDIT, "again"), async {
            yield_now().await;
            interactions.refresh(EDIT).await.unwrap();

            let ids: Vec<String> = interactions.comments(EDIT).into_iter().map(|c| c.id).collect();
            assert_eq!(ids, ["c2", "c1"]);
            release.add_permits(1);
        });

        assert_eq!(outcome.unwrap(), Outcome::Confirmed);
        assert_eq!(interactions.comments(EDIT).len(), 2);
    }
}
