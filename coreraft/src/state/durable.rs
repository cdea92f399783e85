//! File-backed [`RaftStateStorage`].

use std::path::Path;
use std::path::PathBuf;

use async_trait::async_trait;
use bytes::Bytes;
use bytes::BytesMut;
use tokio::io::AsyncWriteExt;

use crate::error::ErrorSubject;
use crate::error::ErrorVerb;
use crate::error::StorageError;
use crate::state::marshal::StateMarshal;
use crate::state::storage::RaftStateStorage;
use crate::state::term_state::TermState;
use crate::state::vote_state::VoteState;
use crate::type_config::RaftTypeConfig;

const TERM_FILE: &str = "term.state";
const VOTE_FILE: &str = "vote.state";

/// Stores the term and vote records as small files in one directory,
/// replaced atomically through a temp-file rename.
///
/// A missing or truncated file reads back as the marshal's start state, so
/// a half-written record from a crash behaves like an absent one.
pub struct FileStateStorage<C, TM, VM>
where
    C: RaftTypeConfig,
    TM: StateMarshal<TermState>,
    VM: StateMarshal<VoteState<C::Member>>,
{
    dir: PathBuf,
    term_marshal: TM,
    vote_marshal: VM,
    _p: std::marker::PhantomData<C>,
}

impl<C, TM, VM> FileStateStorage<C, TM, VM>
where
    C: RaftTypeConfig,
    TM: StateMarshal<TermState>,
    VM: StateMarshal<VoteState<C::Member>>,
{
    pub fn new(dir: impl Into<PathBuf>, term_marshal: TM, vote_marshal: VM) -> Self {
        Self {
            dir: dir.into(),
            term_marshal,
            vote_marshal,
            _p: std::marker::PhantomData,
        }
    }

    async fn read_file(&self, name: &str, subject: ErrorSubject) -> Result<Option<Bytes>, StorageError> {
        let path = self.dir.join(name);
        match tokio::fs::read(&path).await {
            Ok(bytes) => Ok(Some(Bytes::from(bytes))),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(StorageError::new(subject, ErrorVerb::Read, e)),
        }
    }

    async fn write_file(&self, name: &str, data: &[u8], subject: ErrorSubject) -> Result<(), StorageError> {
        let io_err = |e| StorageError::new(subject, ErrorVerb::Write, e);

        tokio::fs::create_dir_all(&self.dir).await.map_err(io_err)?;

        let tmp = self.dir.join(format!("{}.tmp", name));
        let path = self.dir.join(name);

        let mut f = tokio::fs::File::create(&tmp).await.map_err(io_err)?;
        f.write_all(data).await.map_err(io_err)?;
        f.sync_all().await.map_err(io_err)?;
        drop(f);

        tokio::fs::rename(&tmp, &path).await.map_err(io_err)?;
        sync_dir(&self.dir).await.map_err(io_err)?;
        Ok(())
    }
}

async fn sync_dir(dir: &Path) -> Result<(), std::io::Error> {
    let d = tokio::fs::File::open(dir).await?;
    d.sync_all().await
}

#[async_trait]
impl<C, TM, VM> RaftStateStorage<C> for FileStateStorage<C, TM, VM>
where
    C: RaftTypeConfig,
    TM: StateMarshal<TermState> + 'static,
    VM: StateMarshal<VoteState<C::Member>> + 'static,
{
    async fn load_term(&mut self) -> Result<TermState, StorageError> {
        let bytes = self.read_file(TERM_FILE, ErrorSubject::Term).await?;
        let state = bytes.and_then(|mut b| self.term_marshal.unmarshal(&mut b));
        Ok(state.unwrap_or_else(|| self.term_marshal.start_state()))
    }

    async fn persist_term(&mut self, term: &TermState) -> Result<(), StorageError> {
        let mut buf = BytesMut::new();
        self.term_marshal.marshal(term, &mut buf);
        self.write_file(TERM_FILE, &buf, ErrorSubject::Term).await
    }

    async fn load_vote(&mut self) -> Result<VoteState<C::Member>, StorageError> {
        let bytes = self.read_file(VOTE_FILE, ErrorSubject::Vote).await?;
        let state = bytes.and_then(|mut b| self.vote_marshal.unmarshal(&mut b));
        Ok(state.unwrap_or_else(|| self.vote_marshal.start_state()))
    }

    async fn persist_vote(&mut self, vote: &VoteState<C::Member>) -> Result<(), StorageError> {
        let mut buf = BytesMut::new();
        self.vote_marshal.marshal(vote, &mut buf);
        self.write_file(VOTE_FILE, &buf, ErrorSubject::Vote).await
    }
}
