//! 控制台场景指令监听
//!
//! `"0"` -> reset；两位数字 `"ij"` -> swap(i-1, j-1)；其他输入原样拒绝，不改动场景。
//! 监听任务从行通道读取输入，每行在一次加锁内同步执行，然后把回执发回。

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::scene::SceneManager;

/// 解析后的控制台指令（索引已转为从 0 计）
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConsoleCommand {
    Reset,
    Swap { first: usize, second: usize },
}

pub fn parse_console_command(line: &str) -> Result<ConsoleCommand, String> {
    let line = line.trim();
    if line == "0" {
        return Ok(ConsoleCommand::Reset);
    }
    let digits: Vec<u32> = line.chars().filter_map(|c| c.to_digit(10)).collect();
    if line.len() == 2 && digits.len() == 2 {
        // "0x" 与 "x0" 在减一后为负，同样视为越界
        if digits.contains(&0) {
            return Err(format!("Invalid bottle number in '{line}' (use 1-9)"));
        }
        return Ok(ConsoleCommand::Swap {
            first: digits[0] as usize - 1,
            second: digits[1] as usize - 1,
        });
    }
    Err(format!(
        "Unrecognized scene command '{line}' (0 = reset, two digits = swap, e.g. 13)"
    ))
}

#[derive(Clone)]
pub struct CommandListener {
    scene: SceneManager,
}

impl CommandListener {
    pub fn new(scene: SceneManager) -> Self {
        Self { scene }
    }

    /// 处理一行输入并返回回执文本
    pub async fn handle_line(&self, line: &str) -> String {
        let command = match parse_console_command(line) {
            Ok(command) => command,
            Err(message) => {
                tracing::warn!(input = %line.trim(), "scene command rejected");
                return message;
            }
        };

        match command {
            ConsoleCommand::Reset => match self.scene.reset().await {
                Ok(()) => "Scene reset".to_string(),
                Err(e) => format!("Reset failed: {e}"),
            },
            ConsoleCommand::Swap { first, second } => {
                match self.scene.swap(first, second).await {
                    Ok(()) => {
                        let bottles = self.scene.state().bottles();
                        format!(
                            "Swapped {} <-> {}",
                            bottles[first].name, bottles[second].name
                        )
                    }
                    Err(e) => {
                        tracing::warn!(first, second, error = %e, "swap rejected");
                        format!("Swap rejected: {e}")
                    }
                }
            }
        }
    }

    /// 启动监听任务：输入通道关闭或收到关闭信号时退出
    pub fn spawn(
        self,
        mut lines: mpsc::UnboundedReceiver<String>,
        replies: mpsc::UnboundedSender<String>,
        shutdown: CancellationToken,
    ) -> JoinHandle<()> {
        tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = shutdown.cancelled() => break,
                    line = lines.recv() => {
                        let Some(line) = line else { break };
                        let reply = self.handle_line(&line).await;
                        if replies.send(reply).is_err() {
                            break;
                        }
                    }
                }
            }
            tracing::debug!("command listener stopped");
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_console_commands() {
        assert_eq!(parse_console_command("0"), Ok(ConsoleCommand::Reset));
        assert_eq!(parse_console_command(" 13\n"), Ok(ConsoleCommand::Swap { first: 0, second: 2 }));
        assert_eq!(parse_console_command("99"), Ok(ConsoleCommand::Swap { first: 8, second: 8 }));
        assert!(parse_console_command("10").is_err());
        assert!(parse_console_command("123").is_err());
        assert!(parse_console_command("ab").is_err());
        assert!(parse_console_command("").is_err());
    }
}
