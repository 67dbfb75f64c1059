use super::{Creation, Ctx, Dialogue, FlowError, Response, Session};
use crate::callback::Action;
use crate::{keyboards, render};
use chrono::NaiveDateTime;
use nudge_store::{DaySet, NewReminder, RepeatKind, RepeatSpec};
use tracing::info;

impl Dialogue {
    /// Open the creation wizard, replacing any session in progress.
    pub(crate) async fn start_creation(&self, ctx: &Ctx) -> Result<Response, FlowError> {
        self.sessions
            .set(ctx.user_id, Session::Creating(Creation::WaitingText))
            .await;
        Ok(Response::reply(
            ctx.reply(render::ask_text(self.config.max_text_len)),
        ))
    }

    pub(super) async fn creation_input(
        &self,
        ctx: &Ctx,
        step: Creation,
        input: &str,
    ) -> Result<Response, FlowError> {
        match step {
            Creation::WaitingText => {
                let text = self.validate_text(input)?;
                let reply = ctx.reply(render::ask_time(&text));
                self.set(ctx, Creation::WaitingDate { text }).await;
                Ok(Response::reply(reply))
            }
            Creation::WaitingDate { text } => {
                let time = self.future_time(ctx, input)?;
                self.ask_repeat(ctx, text, time).await
            }
            Creation::WaitingRepeat { .. }
            | Creation::WaitingInterval { .. }
            | Creation::WaitingDays { .. } => {
                Ok(Response::reply(ctx.reply(render::use_buttons())))
            }
        }
    }

    /// Button presses of the repeat, interval and weekday steps.
    pub(super) async fn creation_action(
        &self,
        ctx: &Ctx,
        action: Action,
    ) -> Result<Response, FlowError> {
        let Some(Session::Creating(step)) = self.sessions.get(ctx.user_id).await else {
            return Err(FlowError::Stale);
        };

        match (step, action) {
            (Creation::WaitingRepeat { text, time }, Action::Repeat(kind)) => match kind {
                RepeatKind::Once => self.finish(ctx, text, time, RepeatSpec::once()).await,
                RepeatKind::Weekly => self.finish(ctx, text, time, RepeatSpec::weekly(time)).await,
                RepeatKind::Daily => {
                    self.set(ctx, Creation::WaitingInterval { text, time }).await;
                    Ok(Response::reply(
                        ctx.reply(render::ask_interval())
                            .with_markup(keyboards::interval_picker(None)),
                    ))
                }
                RepeatKind::Custom => {
                    let days = DaySet::empty();
                    self.set(ctx, Creation::WaitingDays { text, time, days })
                        .await;
                    Ok(Response::reply(
                        ctx.reply(render::ask_days(0))
                            .with_markup(keyboards::day_picker(days, None)),
                    ))
                }
            },
            (Creation::WaitingInterval { text, time }, Action::Interval(days)) => {
                self.finish(ctx, text, time, RepeatSpec::daily(days)).await
            }
            (Creation::WaitingInterval { text, time }, Action::IntervalBack)
            | (Creation::WaitingDays { text, time, .. }, Action::DaysCancel) => {
                self.ask_repeat(ctx, text, time).await
            }
            (Creation::WaitingDays { text, time, mut days }, Action::Day(day)) => {
                days.toggle(day);
                self.set(ctx, Creation::WaitingDays { text, time, days })
                    .await;
                Ok(Response::reply(
                    ctx.reply(render::ask_days(days.len()))
                        .with_markup(keyboards::day_picker(days, None)),
                ))
            }
            (Creation::WaitingDays { text, time, days }, Action::DaysDone) => {
                if days.is_empty() {
                    return Err(FlowError::NoDaysSelected);
                }
                self.finish(ctx, text, time, RepeatSpec::custom(days)).await
            }
            _ => Err(FlowError::Stale),
        }
    }

    async fn ask_repeat(
        &self,
        ctx: &Ctx,
        text: String,
        time: NaiveDateTime,
    ) -> Result<Response, FlowError> {
        let reply = ctx
            .reply(render::ask_repeat(&text, time))
            .with_markup(keyboards::repeat_picker(None));
        self.set(ctx, Creation::WaitingRepeat { text, time }).await;
        Ok(Response::reply(reply))
    }

    async fn finish(
        &self,
        ctx: &Ctx,
        text: String,
        time: NaiveDateTime,
        repeat: RepeatSpec,
    ) -> Result<Response, FlowError> {
        let id = self
            .store
            .create(&NewReminder {
                user_id: ctx.user_id,
                user_name: ctx.user_name.clone(),
                text: text.clone(),
                time,
                repeat,
                original_id: None,
            })
            .await?;
        self.sessions.clear(ctx.user_id).await;
        info!(
            "user {} created reminder {id} at {time} ({})",
            ctx.user_id,
            repeat.kind.as_str()
        );
        Ok(Response::reply(
            ctx.reply(render::created(&text, time, &repeat))
                .with_markup(keyboards::to_list()),
        ))
    }

    async fn set(&self, ctx: &Ctx, step: Creation) {
        self.sessions
            .set(ctx.user_id, Session::Creating(step))
            .await;
    }
}
