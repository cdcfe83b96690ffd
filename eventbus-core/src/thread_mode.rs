/// 处理器相对于投递调用所要求的执行上下文
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum ThreadMode {
    /// 在投递线程上立即同步执行；唯一允许取消事件传递的模式
    #[default]
    Posting,
    /// 在主线程上执行：投递方即主线程时立即执行，否则排入主线程队列
    Main,
    /// 始终排入主线程队列，保持顺序；无主线程支持时退化为立即执行
    MainOrdered,
    /// 在唯一的后台工作线程上串行执行；投递方不在主线程时直接执行
    Background,
    /// 总是交给执行器的独立任务，彼此之间无顺序保证
    Async,
}
