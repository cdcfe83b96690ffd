use proc_macro::TokenStream;
use syn::{DeriveInput, ItemImpl, parse_macro_input};

mod event;
mod subscriber;
mod utils;

/// 订阅者宏
/// - 作用于订阅者类型的固有 `impl` 块
/// - 块内带 `#[subscribe(...)]` 的方法登记为处理器，并为该类型实现 `::eventbus_core::Subscriber`
/// - 处理器签名必须为 `fn name(&self, event: &E)`，返回 `()` 或 `Result<(), Err>`
/// - 方法参数：`thread_mode = Posting|Main|MainOrdered|Background|Async`、`priority = <i32>`、`sticky`
/// - 宏参数：`#[subscriber(parent = Base)]` 声明内嵌的父订阅者（需实现 `AsRef<Base>`）
#[proc_macro_attribute]
pub fn subscriber(attr: TokenStream, item: TokenStream) -> TokenStream {
    let cfg = parse_macro_input!(attr as subscriber::SubscriberAttrConfig);
    let input = parse_macro_input!(item as ItemImpl);

    subscriber::expand(cfg, input)
        .unwrap_or_else(syn::Error::into_compile_error)
        .into()
}

/// 事件派生宏
/// - 为结构体/枚举实现 `::eventbus_core::Event`
/// - 字段标注 `#[event(parent)]`（至多一个）或 `#[event(interface)]` 声明上级类型，
///   并生成对应的 `AsRef` 实现
#[proc_macro_derive(Event, attributes(event))]
pub fn derive_event(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);

    event::expand(input)
        .unwrap_or_else(syn::Error::into_compile_error)
        .into()
}
