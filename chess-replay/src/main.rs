//! 无界面回放：按固定帧长推进动画，打印编排事件
//!
//! 用法: chess-replay [--config <目录>] [--fen <局面>] [走法...]
//! 走法格式为 `e2e4` 或 `e2-e4`，不给走法时回放一段默认开局。

use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use chess_choreography::{BoardAnimator, ChoreographyEvent, ConfigLoader, ConfigPaths, TemplateLibrary};
use protocol::{Position, RulesEngine, StandardRules};
use tracing::{debug, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// 固定帧长（秒）
const FRAME_SECS: f32 = 1.0 / 60.0;

/// 每步走棋最多推进的帧数
const MAX_FRAMES_PER_MOVE: usize = 60 * 30;

const DEFAULT_MOVES: &[&str] = &["e2e4", "d7d5", "e4d5", "d8d5", "b1c3", "d5a5", "d2d4", "c7c6"];

struct Args {
    config_dir: Option<PathBuf>,
    fen: Option<String>,
    moves: Vec<String>,
}

fn parse_args() -> Result<Args> {
    let mut args = Args {
        config_dir: None,
        fen: None,
        moves: Vec::new(),
    };

    let mut iter = std::env::args().skip(1);
    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "--config" => {
                let dir = iter.next().context("--config 需要一个目录")?;
                args.config_dir = Some(PathBuf::from(dir));
            }
            "--fen" => {
                args.fen = Some(iter.next().context("--fen 需要一个局面")?);
            }
            _ if arg.starts_with("--") => bail!("未知参数: {}", arg),
            _ => args.moves.push(arg),
        }
    }

    if args.moves.is_empty() {
        args.moves = DEFAULT_MOVES.iter().map(|m| m.to_string()).collect();
    }
    Ok(args)
}

/// 解析 `e2e4` / `e2-e4`
fn parse_move(text: &str) -> Result<(Position, Position)> {
    let compact: String = text.chars().filter(|c| *c != '-').collect();
    if compact.len() != 4 || !compact.is_ascii() {
        bail!("无效的走法: {}", text);
    }
    let from = Position::parse_square(&compact[..2]).with_context(|| format!("走法 {}", text))?;
    let to = Position::parse_square(&compact[2..]).with_context(|| format!("走法 {}", text))?;
    Ok((from, to))
}

fn log_event(event: &ChoreographyEvent) {
    match event {
        ChoreographyEvent::ClipStarted { .. } | ChoreographyEvent::ClipMissing { .. } => {
            debug!("{:?}", event)
        }
        _ => info!("{:?}", event),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // 初始化日志
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("chess_replay=debug".parse()?)
                .add_directive("chess_choreography=info".parse()?),
        )
        .init();

    let args = parse_args()?;

    let paths = args.config_dir.map(ConfigPaths::new).unwrap_or_default();
    info!("配置目录: {}", paths.dir.display());
    let loader = ConfigLoader::new(paths, chess_choreography::constants::DEFAULT_LOAD_TIMEOUT_MS);
    let loaded = loader.load_all().await;
    info!(
        "灯光: 环境光 #{:06x} x{}, 平行光 #{:06x} x{}, 阴影 {}",
        loaded.lighting.ambient_color(),
        loaded.lighting.ambient.intensity,
        loaded.lighting.directional_color(),
        loaded.lighting.directional.intensity,
        loaded.lighting.shadows
    );

    let mut rules = match &args.fen {
        Some(fen) => StandardRules::from_fen(fen).context("局面解析失败")?,
        None => StandardRules::new(),
    };

    // 没有模型资源，全部使用占位几何体
    let mut animator = BoardAnimator::from_loaded(loaded, TemplateLibrary::new());
    let count = animator.create_entities(&rules.current_board_state())?;
    info!("回放开始，{} 个棋子", count);

    for text in &args.moves {
        let (from, to) = parse_move(text)?;
        let outcome = animator.apply_rules_move(&mut rules, from, to)?;
        if !outcome.accepted {
            warn!("走法被拒绝: {}，停止回放", text);
            break;
        }
        info!(
            "{} {}{}",
            outcome.standard_notation.as_deref().unwrap_or(text),
            if outcome.is_checkmate { "将死 " } else if outcome.is_check { "将军 " } else { "" },
            outcome.resulting_position
        );

        for event in animator.drain_events() {
            log_event(&event);
        }
        let mut frames = 0;
        while !animator.is_settled() && frames < MAX_FRAMES_PER_MOVE {
            animator.advance(FRAME_SECS);
            for event in animator.drain_events() {
                log_event(&event);
            }
            frames += 1;
        }
        if !animator.is_settled() {
            warn!("{} 在 {} 帧内没有完成", text, MAX_FRAMES_PER_MOVE);
        }
        debug!("{} 用时 {:.0} ms", text, frames as f32 * FRAME_SECS * 1000.0);
    }

    info!(
        "回放结束: 虚拟时间 {:.0} ms，剩余 {} 个棋子",
        animator.now_ms(),
        animator.store().len()
    );
    Ok(())
}
