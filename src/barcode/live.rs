//! # 实时相机识别
//!
//! 相机帧按到达顺序逐帧识别，不做任何预处理。
//! 首次命中后立即关闭帧通道，保证不会有第二个结果写回；
//! 取消信号或帧发送端关闭都会结束循环。

use serde::Serialize;
use tokio::sync::{mpsc, watch};

use super::{DecodeResult, SymbolDecoder};
use crate::image_handler::RgbaFrame;

/// 实时识别结果。
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum LiveScanOutcome {
    Found(DecodeResult),
    /// 用户取消或相机会话关闭；`frames` 为已处理帧数。
    Cancelled { frames: usize },
}

pub struct LiveScanner<D> {
    decoder: D,
}

impl<D: SymbolDecoder> LiveScanner<D> {
    pub fn new(decoder: D) -> Self {
        Self { decoder }
    }

    /// 持续识别直到命中或取消。
    ///
    /// `cancel` 变为 `true`（或其发送端被丢弃）视为用户关闭扫描器。
    pub async fn scan(
        &self,
        mut frames: mpsc::Receiver<RgbaFrame>,
        mut cancel: watch::Receiver<bool>,
    ) -> LiveScanOutcome {
        let mut processed = 0usize;

        if *cancel.borrow_and_update() {
            return Self::cancelled(&mut frames, processed);
        }

        loop {
            tokio::select! {
                biased;

                changed = cancel.changed() => {
                    if changed.is_err() || *cancel.borrow_and_update() {
                        return Self::cancelled(&mut frames, processed);
                    }
                }

                frame = frames.recv() => {
                    let Some(frame) = frame else {
                        log::info!("📷 相机帧通道已关闭，结束实时识别（已处理 {} 帧）", processed);
                        return LiveScanOutcome::Cancelled { frames: processed };
                    };
                    processed += 1;

                    let canvas = match frame.into_canvas() {
                        Ok(canvas) => canvas,
                        Err(err) => {
                            log::warn!("⚠️ 丢弃无效相机帧：{}", err);
                            continue;
                        }
                    };

                    if let Ok(symbol) = self.decoder.decode(&canvas) {
                        // 命中后不再接收任何帧
                        frames.close();
                        let result = DecodeResult::from(symbol);
                        log::info!("✅ 实时识别成功 - format={} frames={}", result.format, processed);
                        return LiveScanOutcome::Found(result);
                    }
                }
            }
        }
    }

    fn cancelled(frames: &mut mpsc::Receiver<RgbaFrame>, processed: usize) -> LiveScanOutcome {
        frames.close();
        log::info!("🛑 实时识别已取消（已处理 {} 帧）", processed);
        LiveScanOutcome::Cancelled { frames: processed }
    }
}
