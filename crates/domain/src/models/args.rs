use serde::{Deserialize, Serialize};

/// 一个有名字的参数项
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Arg {
    pub name: String,
    pub value: String,
}

impl Arg {
    pub fn new<N: Into<String>, V: Into<String>>(name: N, value: V) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

/// 有序的参数列表
///
/// 键唯一且保持插入顺序，合并时以覆盖项优先、新键追加到末尾。
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Args(Vec<Arg>);

impl Args {
    pub fn new() -> Self {
        Self(Vec::new())
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|arg| arg.name == name)
            .map(|arg| arg.value.as_str())
    }

    /// 设置参数值，键已存在时原位覆盖，否则追加
    pub fn set<N: Into<String>, V: Into<String>>(&mut self, name: N, value: V) {
        let name = name.into();
        match self.0.iter_mut().find(|arg| arg.name == name) {
            Some(arg) => arg.value = value.into(),
            None => self.0.push(Arg::new(name, value)),
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arg> {
        self.0.iter()
    }

    /// 合并两组参数：以self为基础，overrides中同名键覆盖原值，新键按序追加
    pub fn merge(&self, overrides: &Args) -> Args {
        if self.is_empty() {
            return overrides.clone();
        }
        if overrides.is_empty() {
            return self.clone();
        }

        let mut merged = self.clone();
        for arg in overrides.iter() {
            merged.set(arg.name.clone(), arg.value.clone());
        }
        merged
    }
}

impl FromIterator<(String, String)> for Args {
    fn from_iter<T: IntoIterator<Item = (String, String)>>(iter: T) -> Self {
        let mut args = Args::new();
        for (name, value) in iter {
            args.set(name, value);
        }
        args
    }
}

impl<N: Into<String>, V: Into<String>, const L: usize> From<[(N, V); L]> for Args {
    fn from(pairs: [(N, V); L]) -> Self {
        let mut args = Args::new();
        for (name, value) in pairs {
            args.set(name, value);
        }
        args
    }
}
