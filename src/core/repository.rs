use std::collections::HashMap;
use std::future::Future;

use crate::core::error::BlogError;
use crate::core::query::{PostQuery, TagQuery};
use crate::models::{LoadedPost, LoadedTag};

/// 博客数据的持久化接口。
///
/// 页面组装函数通过参数拿到仓库，而不是直接访问全局模型。
/// 所有方法都是只读的，同样的数据与查询总是得到同样的结果。
pub trait BlogRepository: Clone + Send + Sync + 'static {
    /// 按查询取标签
    fn tags(
        &self,
        query: &TagQuery,
    ) -> impl Future<Output = Result<Vec<LoadedTag>, BlogError>> + Send;

    /// 按查询取文章，并批量加载查询要求的关联
    fn posts(
        &self,
        query: &PostQuery,
    ) -> impl Future<Output = Result<Vec<LoadedPost>, BlogError>> + Send;

    /// 一次分组查询统计给定文章的评论数，没有评论的文章可以不出现在结果中
    fn comments_count_by_post(
        &self,
        post_ids: &[i64],
    ) -> impl Future<Output = Result<HashMap<i64, u64>, BlogError>> + Send;
}
