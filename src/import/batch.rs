//! 一括作成用のバッチ

/// 一括作成 1 回あたりの最大件数
pub const BATCH_SIZE: usize = 1000;

/// 上限件数に達するたびに中身を払い出すバッファ
#[derive(Debug)]
pub struct Batch<T> {
    items: Vec<T>,
    capacity: usize,
}

impl<T> Batch<T> {
    /// `capacity` は 1 以上に丸める
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            items: Vec::with_capacity(capacity),
            capacity,
        }
    }

    /// 追加して、上限に達したら中身を返す（バッファは空になる）
    pub fn push(&mut self, item: T) -> Option<Vec<T>> {
        self.items.push(item);
        if self.items.len() >= self.capacity {
            Some(self.take())
        } else {
            None
        }
    }

    /// 残りを返す。空なら `None`
    pub fn finish(&mut self) -> Option<Vec<T>> {
        if self.items.is_empty() {
            None
        } else {
            Some(self.take())
        }
    }

    fn take(&mut self) -> Vec<T> {
        std::mem::replace(&mut self.items, Vec::with_capacity(self.capacity))
    }
}
