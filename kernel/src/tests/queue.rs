//! 就绪队列测试

use crate::config::NPROC;
use crate::sched::queue::{QueueEntry, QueueError, ReadyQueue};

fn pids(q: &ReadyQueue) -> Vec<u32> {
    q.iter().map(|e| e.pid).collect()
}

fn keys(q: &ReadyQueue) -> Vec<i32> {
    q.iter().map(|e| e.prio).collect()
}

#[test]
fn orders_by_descending_priority() {
    let mut q = ReadyQueue::new();
    q.insert(1, 10).unwrap();
    q.insert(2, 30).unwrap();
    q.insert(3, 20).unwrap();
    q.insert(4, 5).unwrap();

    assert_eq!(pids(&q), vec![2, 3, 1, 4]);
    assert_eq!(q.len(), 4);
    assert_eq!(q.peek_highest_priority(), Some(30));
}

#[test]
fn equal_priorities_are_fifo() {
    let mut q = ReadyQueue::new();
    q.insert(5, 20).unwrap();
    q.insert(3, 20).unwrap();
    q.insert(9, 30).unwrap();
    q.insert(1, 20).unwrap();

    assert_eq!(pids(&q), vec![9, 5, 3, 1]);
    assert_eq!(q.remove_highest(), Some(QueueEntry { pid: 9, prio: 30 }));
    assert_eq!(q.remove_highest(), Some(QueueEntry { pid: 5, prio: 20 }));
    assert_eq!(q.remove_highest(), Some(QueueEntry { pid: 3, prio: 20 }));
    assert_eq!(q.remove_highest(), Some(QueueEntry { pid: 1, prio: 20 }));
    assert_eq!(q.remove_highest(), None);
}

#[test]
fn rejects_duplicates_and_bad_ids() {
    let mut q = ReadyQueue::new();
    q.insert(7, 10).unwrap();

    assert_eq!(q.insert(7, 40), Err(QueueError::Duplicate(7)));
    assert_eq!(q.key_of(7), Some(10));

    let out = NPROC as u32;
    assert_eq!(q.insert(out, 1), Err(QueueError::OutOfRange(out)));
    assert_eq!(q.remove_by_id(out), Err(QueueError::OutOfRange(out)));
    assert_eq!(q.remove_by_id(8), Err(QueueError::NotFound(8)));
    assert_eq!(q.len(), 1);
}

#[test]
fn empty_queue() {
    let mut q = ReadyQueue::new();
    assert!(q.is_empty());
    assert_eq!(q.peek_highest_priority(), None);
    assert_eq!(q.remove_highest(), None);
    assert!(!q.contains(0));
}

#[test]
fn remove_by_id_from_middle_and_ends() {
    let mut q = ReadyQueue::new();
    for (pid, prio) in [(1, 50), (2, 40), (3, 30), (4, 20)] {
        q.insert(pid, prio).unwrap();
    }

    assert_eq!(q.remove_by_id(3), Ok(30));
    assert_eq!(pids(&q), vec![1, 2, 4]);
    assert_eq!(q.remove_by_id(1), Ok(50));
    assert_eq!(q.remove_by_id(4), Ok(20));
    assert_eq!(pids(&q), vec![2]);
    assert_eq!(q.peek_highest_priority(), Some(40));

    // 摘除后可以重新插入
    q.insert(3, 45).unwrap();
    assert_eq!(pids(&q), vec![3, 2]);
}

#[test]
fn remove_then_insert_round_trip() {
    // 优先级互不相同时完全复原
    let mut q = ReadyQueue::new();
    for (pid, prio) in [(1, 12), (2, 40), (3, 7), (4, 25)] {
        q.insert(pid, prio).unwrap();
    }
    let before: Vec<_> = q.iter().collect();
    for pid in 1..=4 {
        let prio = q.remove_by_id(pid).unwrap();
        q.insert(pid, prio).unwrap();
        assert_eq!(q.iter().collect::<Vec<_>>(), before);
    }

    // 有相同优先级时键序列不变，该进程移到同优先级末尾
    let mut q = ReadyQueue::new();
    for (pid, prio) in [(1, 20), (2, 20), (3, 10)] {
        q.insert(pid, prio).unwrap();
    }
    let before = keys(&q);
    let prio = q.remove_by_id(1).unwrap();
    q.insert(1, prio).unwrap();
    assert_eq!(keys(&q), before);
    assert_eq!(pids(&q), vec![2, 1, 3]);
}

#[test]
fn holds_every_pid() {
    let mut q = ReadyQueue::new();
    for pid in 0..NPROC as u32 {
        q.insert(pid, (pid % 7) as i32).unwrap();
    }
    assert_eq!(q.len(), NPROC);

    let keys = keys(&q);
    assert!(keys.windows(2).all(|w| w[0] >= w[1]));

    let mut drained = 0;
    while q.remove_highest().is_some() {
        drained += 1;
    }
    assert_eq!(drained, NPROC);
    assert!(q.is_empty());
}
