//! Swarm orchestration: spawn bots, fill a room, drive the tick loop

use std::future::Future;

use anyhow::{bail, Context};
use futures::future::join_all;
use tokio::time::{interval, sleep, MissedTickBehavior};
use tracing::{debug, info, warn};
use url::Url;

use crate::bot::{Bot, Session};
use crate::config::Config;
use crate::util::bot_log::BotLog;
use crate::util::time::{
    tick_duration, Timer, HOSTED_ROOM_TIMEOUT, SETTLE_DELAY, SHUTDOWN_GRACE,
};
use crate::ws::protocol::RoomCode;

/// Totals reported when the swarm stops
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SwarmStats {
    pub ticks: u64,
    pub actions: u64,
    pub overruns: u64,
}

/// Run the whole swarm until `shutdown` resolves or every bot has dropped
pub async fn run(config: &Config, shutdown: impl Future<Output = ()>) -> anyhow::Result<SwarmStats> {
    let url = config.server_url()?;
    let seed = config.base_seed();
    info!(
        url = %url,
        amount = config.amount,
        strategy = %config.strategy,
        seed,
        "Starting swarm"
    );

    let mut bots = spawn_bots(config, &url, seed)?;

    tokio::pin!(shutdown);
    let prepared = tokio::select! {
        result = prepare(config, &bots) => Some(result),
        _ = &mut shutdown => None,
    };
    match prepared {
        Some(Ok(())) => {}
        Some(Err(e)) => {
            close_all(&mut bots).await;
            return Err(e);
        }
        None => {
            info!("Shutdown requested during startup");
            close_all(&mut bots).await;
            return Ok(SwarmStats::default());
        }
    }

    let stats = tick_loop(config.tick_rate, &mut bots, &mut shutdown).await;

    sleep(SHUTDOWN_GRACE).await;
    close_all(&mut bots).await;
    info!(
        ticks = stats.ticks,
        actions = stats.actions,
        overruns = stats.overruns,
        "Swarm stopped"
    );
    Ok(stats)
}

fn spawn_bots(config: &Config, url: &Url, seed: u64) -> anyhow::Result<Vec<Bot>> {
    let log_dir = config.bot_log_dir();
    (1..=config.amount)
        .map(|id| {
            let log = BotLog::create(id, log_dir)
                .with_context(|| format!("failed to create log file for bot {id}"))?;
            let session = Session::open(id, url.clone(), log);
            let strategy = config.strategy.build(seed.wrapping_add(u64::from(id)));
            Ok(Bot::new(session, strategy))
        })
        .collect()
}

/// Connect every bot, get them into one room, then let the server settle
async fn prepare(config: &Config, bots: &[Bot]) -> anyhow::Result<()> {
    connect_all(bots).await?;
    let room = enter_room(config, bots).await?;
    info!(room = %room, bots = bots.len(), "Bots in room");
    sleep(SETTLE_DELAY).await;
    Ok(())
}

async fn connect_all(bots: &[Bot]) -> anyhow::Result<()> {
    let results = join_all(bots.iter().map(|bot| bot.session().connect())).await;

    let mut failed = 0;
    let mut first_error = None;
    for (bot, result) in bots.iter().zip(results) {
        if let Err(e) = result {
            warn!(bot_id = bot.id(), error = %e, "Bot failed to connect");
            failed += 1;
            first_error.get_or_insert(e);
        }
    }

    match first_error {
        None => {
            info!(bots = bots.len(), "All bots connected");
            Ok(())
        }
        Some(e) => bail!("{failed} of {} bots failed to connect: {e}", bots.len()),
    }
}

/// Join the configured room, or have bot 1 host one and bring the rest in
async fn enter_room(config: &Config, bots: &[Bot]) -> anyhow::Result<RoomCode> {
    if let Some(room) = &config.room {
        for bot in bots {
            bot.session().join(room)?;
        }
        if config.start {
            warn!("--start only applies to hosted rooms, ignoring");
        }
        return Ok(RoomCode::new(room));
    }

    let (host, guests) = bots.split_first().context("swarm has no bots")?;
    host.session().host()?;
    let room = host
        .session()
        .wait_for_room(HOSTED_ROOM_TIMEOUT)
        .await
        .with_context(|| format!("bot {} received no room code after hosting", host.id()))?;
    info!(bot_id = host.id(), room = %room, "Hosted room");

    let code = room.to_string();
    for bot in guests {
        bot.session().join(&code)?;
    }
    let joined = join_all(
        guests
            .iter()
            .map(|bot| bot.session().wait_for_room(HOSTED_ROOM_TIMEOUT)),
    )
    .await;
    let missing = joined.iter().filter(|room| room.is_none()).count();
    if missing > 0 {
        warn!(missing, "Some bots did not reach the room in time");
    }

    if config.start {
        host.session().start()?;
        info!(room = %room, "Game start requested");
    }
    Ok(room)
}

/// Fixed-rate decision loop
async fn tick_loop(
    tick_rate: u32,
    bots: &mut [Bot],
    shutdown: &mut (impl Future<Output = ()> + Unpin),
) -> SwarmStats {
    let period = tick_duration(tick_rate);
    let mut ticker = interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    let mut stats = SwarmStats::default();

    info!(tick_rate, "Tick loop running, press q then Enter to stop");

    loop {
        tokio::select! {
            _ = &mut *shutdown => break,
            _ = ticker.tick() => {
                let timer = Timer::new();
                let mut live = 0;
                for bot in bots.iter_mut() {
                    if bot.update().is_some() {
                        stats.actions += 1;
                    }
                    if bot.session().status().is_active() {
                        live += 1;
                    }
                }
                stats.ticks += 1;

                if timer.elapsed() > period {
                    stats.overruns += 1;
                    debug!(elapsed_us = timer.elapsed_micros(), "Tick overran its period");
                }
                if live == 0 {
                    warn!("Every bot is inactive, stopping");
                    break;
                }
            }
        }
    }

    stats
}

async fn close_all(bots: &mut [Bot]) {
    join_all(bots.iter_mut().map(|bot| bot.close())).await;
    debug!(bots = bots.len(), "All bots closed");
}
