//! 共享库
//!
//! 包含表单逻辑引擎与周边服务共用的配置、错误处理、日志初始化以及测试夹具。

pub mod config;
pub mod error;
pub mod observability;
pub mod test_utils;
