use super::{Ctx, Dialogue, Edit, FlowError, Response, Session};
use crate::{keyboards, render};
use chrono::Weekday;
use nudge_store::{DaySet, Reminder, ReminderUpdate, RepeatKind, RepeatSpec};
use tracing::info;

impl Dialogue {
    pub(super) async fn begin_edit_text(&self, ctx: &Ctx, id: i64) -> Result<Response, FlowError> {
        let reminder = self.owned(ctx, id).await?;
        self.sessions
            .set(ctx.user_id, Session::Editing(Edit::WaitingNewText { id }))
            .await;
        Ok(Response::reply(ctx.reply(render::ask_new_text(
            &reminder,
            self.config.max_text_len,
        ))))
    }

    pub(super) async fn begin_edit_time(&self, ctx: &Ctx, id: i64) -> Result<Response, FlowError> {
        let reminder = self.owned(ctx, id).await?;
        self.sessions
            .set(ctx.user_id, Session::Editing(Edit::WaitingNewTime { id }))
            .await;
        Ok(Response::reply(ctx.reply(render::ask_new_time(&reminder))))
    }

    /// Typed input while an edit is waiting for it.
    pub(super) async fn edit_input(
        &self,
        ctx: &Ctx,
        step: Edit,
        input: &str,
    ) -> Result<Response, FlowError> {
        let (id, update) = match step {
            Edit::WaitingNewText { id } => {
                self.owned_or_end(ctx, id).await?;
                let text = self.validate_text(input)?;
                (
                    id,
                    ReminderUpdate {
                        text: Some(text),
                        ..Default::default()
                    },
                )
            }
            Edit::WaitingNewTime { id } => {
                self.owned_or_end(ctx, id).await?;
                let time = self.future_time(ctx, input)?;
                // A new time re-arms a delivered reminder.
                (
                    id,
                    ReminderUpdate {
                        time: Some(time),
                        sent: Some(false),
                        ..Default::default()
                    },
                )
            }
            Edit::SelectingDays { .. } => {
                return Ok(Response::reply(ctx.reply(render::use_buttons())));
            }
        };

        self.store.update(id, &update).await?;
        self.sessions.clear(ctx.user_id).await;
        info!("user {} edited reminder {id}", ctx.user_id);
        self.show_updated(ctx, id).await
    }

    /// Repeat-type menu for a reminder.
    pub(super) async fn repeat_menu(&self, ctx: &Ctx, id: i64) -> Result<Response, FlowError> {
        let reminder = self.owned(ctx, id).await?;
        self.drop_day_selection(ctx).await;
        Ok(Response::reply(
            ctx.reply(render::ask_edit_repeat(&reminder))
                .with_markup(keyboards::repeat_picker(Some(id))),
        ))
    }

    pub(super) async fn edit_repeat_kind(
        &self,
        ctx: &Ctx,
        id: i64,
        kind: RepeatKind,
    ) -> Result<Response, FlowError> {
        let reminder = self.owned(ctx, id).await?;
        match kind {
            RepeatKind::Once => self.apply_repeat(ctx, &reminder, RepeatSpec::once()).await,
            RepeatKind::Weekly => {
                self.apply_repeat(ctx, &reminder, RepeatSpec::weekly(reminder.time))
                    .await
            }
            RepeatKind::Daily => Ok(Response::reply(
                ctx.reply(render::ask_interval())
                    .with_markup(keyboards::interval_picker(Some(id))),
            )),
            RepeatKind::Custom => {
                let days = if reminder.repeat.kind == RepeatKind::Custom {
                    reminder.repeat.days
                } else {
                    DaySet::empty()
                };
                self.sessions
                    .set(
                        ctx.user_id,
                        Session::Editing(Edit::SelectingDays { id, days }),
                    )
                    .await;
                Ok(Self::day_picker(ctx, id, days))
            }
        }
    }

    pub(super) async fn edit_interval(
        &self,
        ctx: &Ctx,
        id: i64,
        days: u32,
    ) -> Result<Response, FlowError> {
        let reminder = self.owned(ctx, id).await?;
        self.apply_repeat(ctx, &reminder, RepeatSpec::daily(days))
            .await
    }

    pub(super) async fn edit_day(
        &self,
        ctx: &Ctx,
        id: i64,
        day: Weekday,
    ) -> Result<Response, FlowError> {
        let mut days = self.selected_days(ctx, id).await?;
        self.owned(ctx, id).await?;
        days.toggle(day);
        self.sessions
            .set(
                ctx.user_id,
                Session::Editing(Edit::SelectingDays { id, days }),
            )
            .await;
        Ok(Self::day_picker(ctx, id, days))
    }

    pub(super) async fn edit_days_done(&self, ctx: &Ctx, id: i64) -> Result<Response, FlowError> {
        let days = self.selected_days(ctx, id).await?;
        if days.is_empty() {
            return Err(FlowError::NoDaysSelected);
        }
        let reminder = self.owned(ctx, id).await?;
        self.sessions.clear(ctx.user_id).await;
        self.apply_repeat(ctx, &reminder, RepeatSpec::custom(days))
            .await
    }

    pub(super) async fn edit_days_cancel(
        &self,
        ctx: &Ctx,
        id: i64,
    ) -> Result<Response, FlowError> {
        self.repeat_menu(ctx, id).await
    }

    /// Store a new repeat rule. An occurrence carries it to its series root,
    /// which defines the following occurrences.
    async fn apply_repeat(
        &self,
        ctx: &Ctx,
        reminder: &Reminder,
        repeat: RepeatSpec,
    ) -> Result<Response, FlowError> {
        let update = ReminderUpdate {
            repeat: Some(repeat),
            ..Default::default()
        };
        self.store.update(reminder.id, &update).await?;

        if let Some(root_id) = reminder.original_id {
            match self.store.get(root_id).await? {
                Some(root) if root.user_id == ctx.user_id => {
                    self.store.update(root_id, &update).await?;
                }
                _ => {}
            }
        }

        info!(
            "user {} set repeat of reminder {} to {}",
            ctx.user_id,
            reminder.id,
            repeat.kind.as_str()
        );
        self.show_updated(ctx, reminder.id).await
    }

    async fn show_updated(&self, ctx: &Ctx, id: i64) -> Result<Response, FlowError> {
        let reminder = self.owned(ctx, id).await?;
        Ok(Response::reply(
            ctx.reply(render::updated(&reminder, ctx.now))
                .with_markup(keyboards::control_panel(id)),
        ))
    }

    /// Days picked so far for `id`. Any other session means the button is stale.
    async fn selected_days(&self, ctx: &Ctx, id: i64) -> Result<DaySet, FlowError> {
        match self.sessions.get(ctx.user_id).await {
            Some(Session::Editing(Edit::SelectingDays { id: selecting, days })) if selecting == id => {
                Ok(days)
            }
            _ => Err(FlowError::Stale),
        }
    }

    async fn drop_day_selection(&self, ctx: &Ctx) {
        if let Some(Session::Editing(Edit::SelectingDays { .. })) =
            self.sessions.get(ctx.user_id).await
        {
            self.sessions.clear(ctx.user_id).await;
        }
    }

    /// Like [`Dialogue::owned`], ending the edit when the reminder is gone.
    async fn owned_or_end(&self, ctx: &Ctx, id: i64) -> Result<Reminder, FlowError> {
        let result = self.owned(ctx, id).await;
        if result.is_err() {
            self.sessions.clear(ctx.user_id).await;
        }
        result
    }

    fn day_picker(ctx: &Ctx, id: i64, days: DaySet) -> Response {
        Response::reply(
            ctx.reply(render::ask_days(days.len()))
                .with_markup(keyboards::day_picker(days, Some(id))),
        )
    }
}
