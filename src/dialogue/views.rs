use super::{Ctx, Dialogue, FlowError, Response};
use crate::callback::SnoozeBy;
use crate::{keyboards, render};
use tracing::info;

impl Dialogue {
    /// Greeting with the persistent menu.
    pub(crate) async fn welcome(&self, ctx: &Ctx) -> Result<Response, FlowError> {
        Ok(Response::reply(
            ctx.reply(render::welcome(&ctx.user_name))
                .with_markup(keyboards::main_menu()),
        ))
    }

    pub(crate) async fn help(&self, ctx: &Ctx) -> Result<Response, FlowError> {
        Ok(Response::reply(
            ctx.reply(render::help())
                .with_markup(keyboards::main_menu()),
        ))
    }

    pub(super) async fn main_menu(&self, ctx: &Ctx) -> Result<Response, FlowError> {
        self.sessions.clear(ctx.user_id).await;
        Ok(Response::reply(
            ctx.reply(render::main_menu())
                .with_markup(keyboards::main_menu()),
        ))
    }

    /// One page of the user's active reminders. Out-of-range pages show the last one.
    pub(crate) async fn list_page(&self, ctx: &Ctx, page: usize) -> Result<Response, FlowError> {
        let reminders = self.store.list_active(ctx.user_id).await?;
        if reminders.is_empty() {
            return Ok(Response::reply(
                ctx.reply(render::empty_list())
                    .with_markup(keyboards::empty_list()),
            ));
        }

        let page_size = self.config.page_size;
        let page = page.min(keyboards::page_count(reminders.len(), page_size) - 1);
        Ok(Response::reply(
            ctx.reply(render::list_header(&reminders, ctx.now))
                .with_markup(keyboards::reminder_list(
                    &reminders, page, page_size, ctx.now,
                )),
        ))
    }

    pub(crate) async fn upcoming(&self, ctx: &Ctx) -> Result<Response, FlowError> {
        let reminders = self.store.list_upcoming(ctx.user_id).await?;
        let reply = match render::upcoming(&reminders, ctx.now) {
            Some(text) => ctx.reply(text).with_markup(keyboards::upcoming()),
            None => ctx
                .reply(render::no_upcoming())
                .with_markup(keyboards::empty_list()),
        };
        Ok(Response::reply(reply))
    }

    pub(crate) async fn series(&self, ctx: &Ctx) -> Result<Response, FlowError> {
        let roots = self.store.list_series(ctx.user_id).await?;
        let reply = if roots.is_empty() {
            ctx.reply(render::no_series())
                .with_markup(keyboards::empty_list())
        } else {
            ctx.reply(render::series(&roots))
                .with_markup(keyboards::series_list(&roots))
        };
        Ok(Response::reply(reply))
    }

    pub(super) async fn view(&self, ctx: &Ctx, id: i64) -> Result<Response, FlowError> {
        let reminder = self.owned(ctx, id).await?;
        Ok(Response::reply(
            ctx.reply(render::details(&reminder, ctx.now))
                .with_markup(keyboards::control_panel(id)),
        ))
    }

    pub(super) async fn delete_confirm(&self, ctx: &Ctx, id: i64) -> Result<Response, FlowError> {
        let reminder = self.owned(ctx, id).await?;
        Ok(Response::reply(
            ctx.reply(render::confirm_delete(&reminder))
                .with_markup(keyboards::delete_confirm(id)),
        ))
    }

    pub(super) async fn delete(&self, ctx: &Ctx, id: i64) -> Result<Response, FlowError> {
        self.owned(ctx, id).await?;
        let removed = self.store.delete(id).await?;
        info!("user {} deleted reminder {id} ({removed} rows)", ctx.user_id);
        Ok(Response::reply(
            ctx.reply(render::deleted(removed))
                .with_markup(keyboards::to_list()),
        ))
    }

    /// Acknowledge a reminder. From the control panel the reply leads back to the list;
    /// on a notification it just replaces the buttons.
    pub(super) async fn complete(
        &self,
        ctx: &Ctx,
        id: i64,
        from_panel: bool,
    ) -> Result<Response, FlowError> {
        let reminder = self.owned(ctx, id).await?;
        self.store.complete(id).await?;
        info!("user {} completed reminder {id}", ctx.user_id);
        let mut reply = ctx.reply(render::completed(&reminder));
        if from_panel {
            reply = reply.with_markup(keyboards::to_list());
        }
        Ok(Response::reply(reply))
    }

    pub(super) async fn snooze_menu(&self, ctx: &Ctx, id: i64) -> Result<Response, FlowError> {
        let reminder = self.owned(ctx, id).await?;
        Ok(Response::reply(
            ctx.reply(render::ask_snooze(&reminder))
                .with_markup(keyboards::snooze_options(id)),
        ))
    }

    pub(super) async fn snooze(
        &self,
        ctx: &Ctx,
        id: i64,
        by: SnoozeBy,
    ) -> Result<Response, FlowError> {
        let reminder = self.owned(ctx, id).await?;
        let until = self
            .store
            .snooze(id, by.minutes())
            .await?
            .ok_or(FlowError::NotFound(id))?;
        info!("user {} snoozed reminder {id} until {until}", ctx.user_id);
        Ok(Response::reply(
            ctx.reply(render::snoozed(&reminder, until))
                .with_markup(keyboards::to_list()),
        ))
    }
}
