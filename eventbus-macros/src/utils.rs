use syn::parse::{Parse, ParseStream};
use syn::{Attribute, Ident, Result as SynResult, Token, Type};

// 键值参数：key = <Type>
pub(crate) struct KvType {
    pub(crate) key: Ident,
    #[allow(dead_code)]
    pub(crate) eq: Token![=],
    pub(crate) ty: Type,
}

impl Parse for KvType {
    fn parse(input: ParseStream) -> SynResult<Self> {
        Ok(Self {
            key: input.parse()?,
            eq: input.parse()?,
            ty: input.parse()?,
        })
    }
}

// 取出并移除指定名称的属性
pub(crate) fn take_attrs(attrs: &mut Vec<Attribute>, name: &str) -> Vec<Attribute> {
    let (taken, retained): (Vec<_>, Vec<_>) = std::mem::take(attrs)
        .into_iter()
        .partition(|attr| attr.path().is_ident(name));
    *attrs = retained;
    taken
}
