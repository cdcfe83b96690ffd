//! 订阅者元数据：处理器描述、本地处理器表与外部索引
//!
pub mod handler_method;
pub mod info;
pub mod subscriber;

pub use handler_method::{
    DeclaringType, HandlerMethod, HandlerOutput, ReceiverProjection, SubscriberAny,
};
pub use info::{SimpleSubscriberIndex, SimpleSubscriberInfo, SubscriberIndex, SubscriberInfo};
pub use subscriber::{Handlers, ParentLink, Subscriber, SubscriberClass};
