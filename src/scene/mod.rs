//! 场景一致性层：瓶子登记表、reset / swap、控制台监听与物理 tick

mod listener;
mod manager;
mod registry;
mod ticker;

pub use listener::{parse_console_command, CommandListener, ConsoleCommand};
pub use manager::{SceneManager, SceneState};
pub use registry::{
    BottleRecord, GridCell, BOTTLE_COUNT, BOTTLE_HALF_HEIGHT, COLUMN_SPACING, GRID_COLS, GRID_ROWS,
    INGREDIENTS, SHELF_STEP_HEIGHT, SHELF_Y, TABLE_HEIGHT,
};
pub use ticker::{TickScheduler, MIN_TICK_PERIOD};
