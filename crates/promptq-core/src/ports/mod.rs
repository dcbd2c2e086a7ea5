//! Ports - 抽象化レイヤー
//!
//! 時刻・ID 生成・キュー表面を trait として切り出し、
//! テストでは FixedClock などに差し替えられるようにします。

pub mod clock;
pub mod id_generator;
pub mod prompt_queue;

pub use self::clock::{Clock, FixedClock, SystemClock};
pub use self::id_generator::{IdGenerator, UlidGenerator};
pub use self::prompt_queue::{PortError, PromptQueue};
